//! Graphics backend layer.
//!
//! This module is responsible for:
//! - the [`GraphicsBackend`] seam the core issues every GPU call through
//! - the OpenGL implementation ([`GlBackend`]) bound to a window surface
//! - a recording implementation ([`HeadlessBackend`]) for GPU-free runs

mod backend;
mod error;
mod gl;
mod headless;
mod init;

pub use backend::{
    AttributePointer, BufferId, BufferTarget, BufferUsage, GraphicsBackend, ProgramAttribute,
    ProgramId, SamplerDesc, TextureFilter, TextureId, TextureWrap, VertexArrayId,
};
pub use error::BackendError;
pub use gl::GlBackend;
pub use headless::{BackendCall, HeadlessBackend};
pub use init::GlInit;
