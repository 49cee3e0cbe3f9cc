use winit::window::{Window, WindowId};

use crate::device::GlBackend;
use crate::events::EventBus;
use crate::graphics::Graphics;

/// Window handle and metadata available to app callbacks.
pub struct WindowCtx<'a> {
    pub id:     WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Returns the logical window size as `(width, height)` in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let phys  = self.window.inner_size();
        let scale = self.window.scale_factor();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(scale);
        (logi.width as f32, logi.height as f32)
    }

    /// Returns the drawable size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

/// Context passed to [`App::on_init`](super::App::on_init).
///
/// Subscriptions made through `events` run before the runtime's own
/// handlers, so an app can intercept `WindowClose` or `QuitRequested`.
pub struct InitCtx<'a> {
    pub window:   WindowCtx<'a>,
    pub graphics: &'a mut Graphics<GlBackend>,
    pub events:   &'a mut EventBus,
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// The render target is already cleared; it is presented after the callback
/// returns.
pub struct FrameCtx<'a> {
    pub window:      WindowCtx<'a>,
    pub graphics:    &'a mut Graphics<GlBackend>,
    /// Frames completed before this one.
    pub frame_index: u64,
}
