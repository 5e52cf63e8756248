//! GPU bootstrap error types.

use std::fmt;

use ash::vk;
use thiserror::Error;

/// Errors raised by a single bootstrap stage.
#[derive(Error, Debug)]
pub enum GpuError {
    /// The Vulkan loader could not be found or loaded.
    #[error("Vulkan loader unavailable: {0}")]
    LoaderUnavailable(String),

    /// A required instance extension is not reported by the loader.
    #[error("Required extension not available: {0}")]
    ExtensionUnavailable(String),

    /// Validation was requested but the layer is not installed.
    #[error("Validation layer not available: {0}")]
    LayerUnavailable(String),

    /// The platform rejected the window handle.
    #[error("Surface creation failed: {0}")]
    SurfaceCreationFailed(String),

    /// No physical device offers graphics, presentation and the required extensions.
    #[error("No suitable physical device found")]
    NoSuitablePhysicalDevice,

    /// The driver rejected the logical device request.
    #[error("Device creation failed: {0}")]
    DeviceCreationFailed(String),

    /// The driver rejected the swapchain descriptor.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreationFailed(String),

    /// The context was already torn down.
    #[error("Context has been destroyed")]
    ContextDestroyed,

    /// Vulkan error from a query call.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

/// The bootstrap stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Instance,
    Surface,
    Device,
    Swapchain,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Instance => "instance",
            Self::Surface => "surface",
            Self::Device => "device",
            Self::Swapchain => "swapchain",
        };
        f.write_str(name)
    }
}

/// Stage-tagged error surfaced by the context orchestrator.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct BootstrapError {
    /// Stage that failed.
    pub stage: Stage,
    /// Underlying reason.
    pub source: GpuError,
}

impl BootstrapError {
    pub fn new(stage: Stage, source: GpuError) -> Self {
        Self { stage, source }
    }

    /// Returns a closure tagging a [`GpuError`] with `stage`, for use with `map_err`.
    pub fn at(stage: Stage) -> impl FnOnce(GpuError) -> Self {
        move |source| Self::new(stage, source)
    }
}
