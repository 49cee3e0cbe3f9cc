use anyhow::Result;
use bytemuck::{Pod, Zeroable};

use crate::device::{BufferUsage, GraphicsBackend};

use super::{ArrayHandle, ArrayUsage, AttributeType, Graphics, VertexLayout};

/// Vertex format of the shared quad batch.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadBatchVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl QuadBatchVertex {
    /// Attribute names a batch shader binds to.
    pub const POSITION: &'static str = "position";
    pub const COLOR: &'static str = "color";
    pub const UV: &'static str = "uv";

    pub fn layout() -> VertexLayout {
        VertexLayout::new([
            (Self::POSITION, AttributeType::Float3),
            (Self::COLOR, AttributeType::Float4),
            (Self::UV, AttributeType::Float2),
        ])
    }
}

/// Four corners of one quad, wound to match [`quad_indices`].
pub type Quad = [QuadBatchVertex; 4];

/// Shared dynamic geometry for batched quads.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct QuadBatch {
    array: ArrayHandle,
    max_quads: u32,
}

impl QuadBatch {
    pub fn array(&self) -> ArrayHandle {
        self.array
    }

    pub fn max_quads(&self) -> u32 {
        self.max_quads
    }
}

/// Index pattern for `max_quads` quads: `{4i, 4i+1, 4i+2, 4i+2, 4i+3, 4i}`.
pub fn quad_indices(max_quads: u32) -> Vec<u32> {
    (0..max_quads)
        .flat_map(|i| {
            let base = 4 * i;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect()
}

impl<B: GraphicsBackend> Graphics<B> {
    /// Allocates the batch array and uploads its index pattern once.
    pub(super) fn create_quad_batch(&mut self, max_quads: u32) -> Result<QuadBatch> {
        let max_vertices = max_quads
            .checked_mul(4)
            .unwrap_or_else(|| panic!("quad batch of {max_quads} quads overflows u32 vertices"));

        let usage = ArrayUsage {
            vertices: BufferUsage::Dynamic,
            indices: BufferUsage::Static,
        };
        let array =
            self.create_array_with(usage, max_vertices, max_quads * 2, QuadBatchVertex::layout())?;
        self.set_index_data(array, &quad_indices(max_quads), 0, max_quads * 2);

        log::debug!("quad batch ready: {max_quads} quads in {array}");
        Ok(QuadBatch { array, max_quads })
    }

    /// The shared quad batch, unless disabled by configuration.
    pub fn quad_batch(&self) -> Option<QuadBatch> {
        self.quad_batch
    }

    /// Writes `quads` into the batch starting at quad `first`.
    ///
    /// # Panics
    /// If the batch is disabled or the write exceeds its capacity.
    pub fn write_quads(&mut self, quads: &[Quad], first: u32) {
        let batch = self.require_quad_batch();
        let end = u64::from(first) + quads.len() as u64;
        assert!(
            end <= u64::from(batch.max_quads),
            "quad write {first}..{end} exceeds capacity {} of the quad batch",
            batch.max_quads
        );

        // Bounded by max_quads, whose vertex count fits in u32.
        let vertices: &[QuadBatchVertex] = bytemuck::cast_slice(quads);
        self.set_vertex_data(batch.array, vertices, first * 4, quads.len() as u32 * 4);
    }

    /// Draws the first `count` quads of the batch with the active program.
    ///
    /// # Panics
    /// If the batch is disabled or `count` exceeds its capacity.
    pub fn draw_quads(&mut self, count: u32) {
        let batch = self.require_quad_batch();
        assert!(
            count <= batch.max_quads,
            "draw of {count} quads exceeds capacity {} of the quad batch",
            batch.max_quads
        );
        self.draw_array_triangles(batch.array, count * 2);
    }

    fn require_quad_batch(&self) -> QuadBatch {
        self.quad_batch
            .unwrap_or_else(|| panic!("quad batch is disabled (quad_batch_max_quads = 0)"))
    }
}

#[cfg(test)]
mod tests {
    use crate::device::BackendCall;
    use crate::graphics::system::{headless, headless_bare};
    use crate::graphics::GraphicsConfig;

    use super::*;

    fn corner(x: f32, y: f32) -> QuadBatchVertex {
        QuadBatchVertex {
            position: [x, y, 0.0],
            color: [1.0; 4],
            uv: [x, y],
        }
    }

    fn unit_quad() -> Quad {
        [corner(0.0, 0.0), corner(1.0, 0.0), corner(1.0, 1.0), corner(0.0, 1.0)]
    }

    #[test]
    fn index_pattern_per_quad() {
        let indices = quad_indices(5);
        assert_eq!(indices.len(), 30);
        for (i, quad) in indices.chunks(6).enumerate() {
            let b = 4 * i as u32;
            assert_eq!(quad, [b, b + 1, b + 2, b + 2, b + 3, b]);
        }
    }

    #[test]
    fn vertex_matches_layout() {
        let layout = QuadBatchVertex::layout();
        assert_eq!(layout.stride() as usize, size_of::<QuadBatchVertex>());
        assert_eq!(layout.attribute(QuadBatchVertex::COLOR).map(|a| a.offset), Some(12));
        assert_eq!(layout.attribute(QuadBatchVertex::UV).map(|a| a.offset), Some(28));
    }

    #[test]
    fn batch_indices_are_uploaded_once() {
        let g = headless(GraphicsConfig {
            quad_batch_max_quads: 3,
            ..GraphicsConfig::default()
        });
        let batch = g.quad_batch().unwrap();

        let bytes = g
            .backend
            .buffer_bytes(g.arrays.get(batch.array()).index_buffer)
            .unwrap();
        assert_eq!(bytes, bytemuck::cast_slice::<u32, u8>(&quad_indices(3)));
    }

    #[test]
    fn quads_are_written_four_vertices_apart() {
        let mut g = headless(GraphicsConfig {
            quad_batch_max_quads: 4,
            ..GraphicsConfig::default()
        });
        let stride = size_of::<QuadBatchVertex>();

        g.write_quads(&[unit_quad(), unit_quad()], 1);

        assert!(g.backend.calls().contains(&BackendCall::WriteBuffer {
            target: crate::device::BufferTarget::Vertex,
            offset: 4 * stride,
            len: 8 * stride,
        }));
    }

    #[test]
    fn draw_quads_draws_two_triangles_each() {
        let mut g = headless(GraphicsConfig::default());
        g.draw_quads(3);
        assert_eq!(
            g.backend.calls().last(),
            Some(&BackendCall::DrawIndexedTriangles(18))
        );
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn writing_past_the_batch_panics() {
        let mut g = headless(GraphicsConfig {
            quad_batch_max_quads: 1,
            ..GraphicsConfig::default()
        });
        g.write_quads(&[unit_quad()], 1);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn huge_first_quad_panics() {
        let mut g = headless(GraphicsConfig {
            quad_batch_max_quads: 4,
            ..GraphicsConfig::default()
        });
        g.write_quads(&[unit_quad()], 0x4000_0000);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn huge_quad_draw_panics() {
        let mut g = headless(GraphicsConfig {
            quad_batch_max_quads: 4,
            ..GraphicsConfig::default()
        });
        g.draw_quads(0x8000_0001);
    }

    #[test]
    #[should_panic(expected = "quad batch is disabled")]
    fn disabled_batch_panics() {
        headless_bare().draw_quads(1);
    }
}
