/// Configuration for [`Graphics::init`](super::Graphics::init).
#[derive(Debug, Clone)]
pub struct GraphicsConfig {
    /// Capacity of the shared quad batch, in quads.
    ///
    /// Zero disables the batch entirely.
    pub quad_batch_max_quads: u32,

    /// Color the render target is cleared to at the start of each frame.
    pub clear_color: [f32; 4],

    /// Enable straight-alpha blending (`src.a`, `1 - src.a`).
    pub blending: bool,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            quad_batch_max_quads: 1000,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            blending: true,
        }
    }
}
