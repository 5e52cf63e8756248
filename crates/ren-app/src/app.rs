//! `RenApp` trait definition.

use crate::context::AppContext;
use winit::event::WindowEvent;

/// Trait for applications driven by [`run_app`](crate::run_app).
///
/// The runner handles window creation, GPU context bootstrap, swapchain
/// recreation on resize and teardown on exit.
pub trait RenApp: Sized {
    /// Initialize the application.
    ///
    /// Called once, after the window and GPU context have been created.
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self>;

    /// Handle window resize.
    ///
    /// Called after the swapchain has been recreated for the new size.
    #[allow(unused_variables)]
    fn on_resize(&mut self, ctx: &mut AppContext, width: u32, height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handle window events.
    ///
    /// Return `true` if the event was handled and should not be processed further.
    #[allow(unused_variables)]
    fn on_event(&mut self, event: &WindowEvent) -> bool {
        false
    }

    /// Cleanup before shutdown.
    ///
    /// Called while the GPU context is still alive.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut AppContext) {}
}
