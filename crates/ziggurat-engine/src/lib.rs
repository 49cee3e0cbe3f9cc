//! Ziggurat engine crate.
//!
//! GPU resource management and draw dispatch over an immediate-mode graphics
//! API, plus the window runtime that drives it.
//!
//! - [`graphics`]: array/texture registry, layout compiler, draw dispatcher
//! - [`device`]: the backend seam with OpenGL and headless implementations
//! - [`asset`], [`events`]: collaborators the core talks to
//! - [`window`], [`core`]: the platform loop and the app contract

pub mod asset;
pub mod core;
pub mod device;
pub mod events;
pub mod graphics;
pub mod logging;
pub mod window;
