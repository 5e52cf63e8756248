//! Platform glue for the ren renderer.
//!
//! Creates winit windows for the renderer to bind a surface to.

use std::sync::Arc;

use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "ren".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

impl PlatformConfig {
    /// Window attributes for this configuration.
    pub fn window_attributes(&self) -> WindowAttributes {
        Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(PhysicalSize::new(self.width, self.height))
            .with_resizable(self.resizable)
    }
}

/// Create a window on the running event loop.
pub fn create_window(event_loop: &ActiveEventLoop, config: &PlatformConfig) -> Result<Arc<Window>> {
    let window = event_loop
        .create_window(config.window_attributes())
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;

    let size = window.inner_size();
    tracing::info!(
        title = %config.title,
        width = size.width,
        height = size.height,
        "Window created"
    );

    Ok(Arc::new(window))
}

/// A window with no drawable area (minimized on most platforms).
pub fn is_minimized(size: PhysicalSize<u32>) -> bool {
    size.width == 0 || size.height == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlatformConfig::default();
        assert_eq!(config.title, "ren");
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(config.resizable);
    }

    #[test]
    fn attributes_follow_config() {
        let config = PlatformConfig {
            title: "viewer".into(),
            width: 640,
            height: 480,
            resizable: false,
        };
        let attrs = config.window_attributes();
        assert_eq!(attrs.title, "viewer");
        assert!(!attrs.resizable);
        assert_eq!(
            attrs.inner_size,
            Some(PhysicalSize::new(640u32, 480u32).into())
        );
    }

    #[test]
    fn zero_area_is_minimized() {
        assert!(is_minimized(PhysicalSize::new(0, 600)));
        assert!(is_minimized(PhysicalSize::new(800, 0)));
        assert!(!is_minimized(PhysicalSize::new(800, 600)));
    }
}
