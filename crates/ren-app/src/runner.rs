//! Application runner and event loop.

use anyhow::Context;
use ren_gpu::NativeWindow;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::app::RenApp;
use crate::config::AppConfig;
use crate::context::AppContext;

/// Install the `tracing` subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a subscriber is already installed.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run a `RenApp` with the given configuration.
///
/// Initializes logging, creates the window and GPU context, and runs the
/// event loop until the window is closed. A bootstrap failure ends the loop
/// and is returned.
pub fn run_app<A: RenApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    init_logging();

    info!("{} starting...", config.window.title);

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    // Only resize and close events matter; nothing renders continuously
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut runner = AppRunner::<A> {
        config,
        state: None,
        error: None,
    };

    event_loop
        .run_app(&mut runner)
        .context("Event loop error")?;

    match runner.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Internal application runner that implements winit's `ApplicationHandler`.
struct AppRunner<A: RenApp> {
    config: AppConfig,
    state: Option<AppState<A>>,
    error: Option<anyhow::Error>,
}

/// Internal application state.
struct AppState<A: RenApp> {
    // Dropped before the context so the app can release its own resources first
    app: A,
    ctx: AppContext,
}

impl<A: RenApp + 'static> ApplicationHandler for AppRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        // Let the app handle the event first
        if let Some(state) = &mut self.state {
            if state.app.on_event(&event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                if let Some(mut state) = self.state.take() {
                    state.cleanup();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    if let Err(e) = state.handle_resize(size) {
                        error!("Resize error: {e:#}");
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(state) = &mut self.state {
                    if let Err(e) = state.ctx.retry_stale() {
                        warn!("Swapchain still stale: {e:#}");
                    }
                }
            }
            _ => {}
        }
    }
}

impl<A: RenApp + 'static> AppRunner<A> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<A>> {
        let window = ren_platform::create_window(event_loop, &self.config.platform_config())?;
        let native = NativeWindow::from_window(window.as_ref())?;

        let size = window.inner_size();
        let gpu = self
            .config
            .context_builder(size.width, size.height)
            .build(&native)
            .context("Failed to bootstrap GPU context")?;

        if let Some(device) = gpu.device() {
            info!("GPU: {}", device.info().summary());
        }

        let mut ctx = AppContext::new(window, gpu);
        let app = A::init(&mut ctx)?;

        Ok(AppState { app, ctx })
    }
}

impl<A: RenApp> AppState<A> {
    fn handle_resize(&mut self, size: PhysicalSize<u32>) -> anyhow::Result<()> {
        if !self.ctx.handle_resize(size)? {
            return Ok(());
        }

        // Notify the application
        self.app.on_resize(&mut self.ctx, size.width, size.height)?;

        info!("Resized to {}x{}", size.width, size.height);
        Ok(())
    }

    fn cleanup(&mut self) {
        info!("Starting cleanup...");

        // Let the app cleanup first
        self.app.cleanup(&mut self.ctx);

        // Then release the GPU context
        self.ctx.gpu.teardown();

        info!("Cleanup complete");
    }
}
