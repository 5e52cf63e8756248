//! Vulkan context bootstrap for the ren renderer.
//!
//! This crate provides:
//! - Vulkan instance creation with optional validation
//! - Surface binding for a platform window
//! - Physical device selection and logical device creation
//! - Swapchain negotiation and recreation
//! - [`RenderContext`], which runs those stages in order and tears them down in reverse

pub mod api;
pub mod capabilities;
pub mod context;
pub mod device;
pub mod error;
pub mod instance;
pub mod surface;
pub mod swapchain;

#[cfg(test)]
mod mock;

pub use api::{GpuApi, VulkanApi};
pub use capabilities::{GpuVendor, PhysicalDeviceInfo, QueueFamilySupport};
pub use context::{BootstrapConfig, BootstrapState, ContextBuilder, RenderContext};
pub use device::{DeviceConfig, QueueFamilyIndices, VulkanDevice};
pub use error::{BootstrapError, GpuError, Result, Stage};
pub use instance::{InstanceConfig, VulkanInstance};
pub use surface::{NativeWindow, SurfaceCapabilities, VulkanSurface};
pub use swapchain::{PresentStatus, Swapchain, SwapchainConfig, SwapchainPlan, SwapchainRequest};
