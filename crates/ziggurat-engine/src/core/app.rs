use anyhow::Result;

use crate::device::GlBackend;
use crate::graphics::Graphics;

use super::ctx::{FrameCtx, InitCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    /// Called once the window and graphics system exist, before the first
    /// frame. Returning an error stops the runtime.
    fn on_init(&mut self, ctx: &mut InitCtx<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called once per frame between clear and present.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl;

    /// Called before the graphics system is torn down, so the app can delete
    /// the arrays, textures and programs it owns.
    fn on_cleanup(&mut self, graphics: &mut Graphics<GlBackend>) {
        let _ = graphics;
    }
}
