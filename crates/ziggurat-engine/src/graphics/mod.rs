//! GPU resource and draw-dispatch core.
//!
//! Clients describe a vertex layout, create arrays (paired vertex + index
//! storage), stream data into them, and draw them with whatever program is
//! active. The core tracks what the context has bound so repeated draws only
//! issue the state changes that actually differ:
//!
//! - an array's buffers are rebound only when a different array is used
//! - attribute slots are matched by name against the active program per draw
//! - only slots whose enabled state changes are toggled
//!
//! Contract violations (zero capacity, out-of-range writes, stale handles)
//! panic. Backend refusals surface as `anyhow` errors.

mod arrays;
mod config;
mod draw;
mod layout;
mod quad_batch;
mod slots;
mod system;
mod textures;

pub use arrays::{ArrayHandle, ArrayUsage, TRIANGLE_INDEX_BYTES};
pub use config::GraphicsConfig;
pub use layout::{AttributeLayout, AttributeType, ScalarKind, VertexLayout};
pub use quad_batch::{quad_indices, Quad, QuadBatch, QuadBatchVertex};
pub use system::Graphics;
pub use textures::TextureHandle;
