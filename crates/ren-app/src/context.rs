//! Application context.

use std::sync::Arc;

use ren_gpu::{BootstrapState, RenderContext};
use winit::dpi::PhysicalSize;
use winit::window::Window;

/// Application context shared across all app methods.
///
/// Owns the GPU context and the window it renders to.
pub struct AppContext {
    /// GPU context. Declared before the window so it is released first.
    pub gpu: RenderContext,
    /// The window handle.
    pub window: Arc<Window>,
    minimized: bool,
}

impl AppContext {
    pub(crate) fn new(window: Arc<Window>, gpu: RenderContext) -> Self {
        Self {
            gpu,
            window,
            minimized: false,
        }
    }

    /// Whether the window currently has no drawable area.
    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Rebuild the swapchain for a new window size.
    ///
    /// Returns `false` when the window is minimized and nothing was rebuilt.
    pub(crate) fn handle_resize(&mut self, size: PhysicalSize<u32>) -> anyhow::Result<bool> {
        self.minimized = ren_platform::is_minimized(size);
        if self.minimized {
            tracing::debug!("Window minimized, deferring swapchain recreate");
            return Ok(false);
        }

        self.gpu.recreate_swapchain(size.width, size.height)?;
        Ok(true)
    }

    /// Retry a swapchain rebuild left stale by an earlier failure.
    pub(crate) fn retry_stale(&mut self) -> anyhow::Result<()> {
        if self.minimized || self.gpu.state() != BootstrapState::SwapchainStale {
            return Ok(());
        }
        let size = self.window.inner_size();
        self.gpu.recreate_swapchain(size.width, size.height)?;
        Ok(())
    }
}
