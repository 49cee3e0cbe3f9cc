/// Initialization parameters for the OpenGL backend.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or driver requirement exists.
#[derive(Debug, Clone)]
pub struct GlInit {
    /// Synchronize presentation with the display refresh.
    pub vsync: bool,

    /// Request a debug context from the driver.
    ///
    /// Debug contexts are slower; enable them only while chasing driver errors.
    pub debug_context: bool,

    /// Requested context version as `(major, minor)`.
    ///
    /// Vertex-array objects and integer attribute pointers need 3.0+; the core
    /// profile of 3.3 is broadly available.
    pub version: (u8, u8),

    /// Stencil bits requested for the default framebuffer.
    pub stencil_bits: u8,
}

impl Default for GlInit {
    fn default() -> Self {
        Self {
            vsync: true,
            debug_context: cfg!(debug_assertions),
            version: (3, 3),
            stencil_bits: 8,
        }
    }
}
