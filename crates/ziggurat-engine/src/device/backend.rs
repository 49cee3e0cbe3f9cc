use std::num::NonZeroU32;

use crate::graphics::{AttributeType, ScalarKind};

use super::BackendError;

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(pub NonZeroU32);

        impl $name {
            #[inline]
            pub fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

object_id!(
    /// Backend name of a buffer object.
    BufferId
);
object_id!(
    /// Backend name of a 2-D texture object.
    TextureId
);
object_id!(
    /// Backend name of a linked shader program.
    ProgramId
);
object_id!(
    /// Backend name of a vertex-array object.
    VertexArrayId
);

/// Bind point of a buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    Vertex,
    /// `u32` triangle indices.
    Index,
}

/// Update-frequency hint passed when storage is reserved.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    Static,
    /// Rewritten frequently.
    #[default]
    Dynamic,
}

/// Read parameters for one vertex-attribute slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttributePointer {
    /// Components per vertex (1..=4).
    pub components: u8,
    pub scalar: ScalarKind,
    /// Byte distance between consecutive vertices.
    pub stride: u32,
    /// Byte offset of the attribute within a vertex.
    pub offset: u32,
}

/// One input declared by a linked program.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProgramAttribute {
    pub name: String,
    pub slot: u32,
    /// Declared type, when the backend can express it as an [`AttributeType`].
    pub ty: Option<AttributeType>,
}

/// Sampler state applied to a texture at creation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SamplerDesc {
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureFilter {
    Linear,
    Nearest,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
}

impl Default for SamplerDesc {
    /// Bilinear filtering with edge-clamp wrapping.
    fn default() -> Self {
        Self {
            filter: TextureFilter::Linear,
            wrap: TextureWrap::ClampToEdge,
        }
    }
}

/// Immediate-mode graphics API consumed by [`Graphics`](crate::graphics::Graphics).
///
/// The contract mirrors a GL-style state machine: buffers are written through
/// whatever is bound to a [`BufferTarget`], attribute slots are toggled one at
/// a time, and draws read from the bound index buffer. Implementations must
/// not cache or elide calls; redundancy elimination belongs to the caller.
///
/// All calls happen on the thread that owns the context.
pub trait GraphicsBackend {
    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Result<BufferId, BackendError>;

    fn delete_buffer(&mut self, buffer: BufferId);

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>);

    /// Reserves `size` uninitialized bytes for the buffer bound to `target`.
    fn allocate_buffer(
        &mut self,
        target: BufferTarget,
        size: usize,
        usage: BufferUsage,
    ) -> Result<(), BackendError>;

    /// Overwrites `data.len()` bytes at `offset` in the buffer bound to `target`.
    fn write_buffer(&mut self, target: BufferTarget, offset: usize, data: &[u8]);

    // ── vertex input ──────────────────────────────────────────────────────

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, BackendError>;

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    fn enable_attribute(&mut self, slot: u32);

    fn disable_attribute(&mut self, slot: u32);

    /// Configures `slot` to read floating-point data (no normalization).
    fn float_attribute_pointer(&mut self, slot: u32, pointer: AttributePointer);

    /// Configures `slot` to read integer data without conversion.
    fn integer_attribute_pointer(&mut self, slot: u32, pointer: AttributePointer);

    // ── programs ──────────────────────────────────────────────────────────

    fn use_program(&mut self, program: Option<ProgramId>);

    /// Lists the vertex inputs of a linked program with their slot indices.
    fn program_attributes(&mut self, program: ProgramId) -> Vec<ProgramAttribute>;

    /// Asks the driver whether `program` can run against the current state
    /// (sampler-unit conflicts and the like). The error carries the
    /// driver's info log.
    fn validate_program(&mut self, program: ProgramId) -> Result<(), BackendError>;

    // ── textures ──────────────────────────────────────────────────────────

    /// Number of texture slots a fragment stage can sample from.
    fn max_texture_slots(&self) -> u32;

    /// Number of texture units across all stages combined.
    fn max_texture_units(&self) -> u32;

    /// Creates a single-level RGBA8 texture filled with `pixels`, with
    /// immutable storage where the driver supports it.
    ///
    /// Creation goes through the active texture slot and leaves that slot
    /// with no texture bound.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
        sampler: SamplerDesc,
    ) -> Result<TextureId, BackendError>;

    fn bind_texture(&mut self, slot: u32, texture: Option<TextureId>);

    fn delete_texture(&mut self, texture: TextureId);

    // ── frame ─────────────────────────────────────────────────────────────

    fn set_blending(&mut self, enabled: bool);

    fn draw_indexed_triangles(&mut self, index_count: u32);

    fn clear(&mut self, color: [f32; 4]);

    fn present(&mut self) -> Result<(), BackendError>;

    /// Resizes the drawable. Zero-sized requests are ignored.
    fn resize(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }
}
