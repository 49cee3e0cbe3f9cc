//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and wires them to the OpenGL
//! backend, the event bus and the graphics system.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
