//! Application runner for the ren renderer.
//!
//! Handles the boilerplate around a [`RenderContext`]:
//! - Logging setup
//! - Configuration loading
//! - Window creation
//! - Context bootstrap, swapchain recreation on resize, teardown on close
//!
//! # Example
//!
//! ```no_run
//! use ren_app::{run_app, AppConfig, AppContext, RenApp};
//!
//! struct MyApp;
//!
//! impl RenApp for MyApp {
//!     fn init(_ctx: &mut AppContext) -> anyhow::Result<Self> {
//!         Ok(MyApp)
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<MyApp>(AppConfig::default())
//! }
//! ```

mod app;
mod config;
mod context;
mod runner;

pub use app::RenApp;
pub use config::{AppConfig, GpuSettings, WindowSettings};
pub use context::AppContext;
pub use runner::{init_logging, run_app};

pub use ren_gpu::{BootstrapState, RenderContext};
pub use winit::event::WindowEvent;
