//! Graphics-API seam the context orchestrator is generic over.
//!
//! [`VulkanApi`] is the production implementation. Each method maps onto one
//! bootstrap stage, so the orchestrator owns ordering, rollback and recreate
//! policy while the implementation owns the handles.

use crate::device::{DeviceConfig, VulkanDevice};
use crate::error::Result;
use crate::instance::{InstanceConfig, VulkanInstance};
use crate::surface::{NativeWindow, VulkanSurface};
use crate::swapchain::{Swapchain, SwapchainRequest};

/// Creation and destruction of the four bootstrap stages.
pub trait GpuApi {
    type Instance;
    type Surface;
    type Device;
    type Swapchain;

    /// Create the API instance, enabling what `window` needs to present.
    fn create_instance(
        &mut self,
        config: &InstanceConfig,
        window: &NativeWindow,
    ) -> Result<Self::Instance>;

    /// Bind `window` to a presentable surface.
    fn create_surface(
        &mut self,
        instance: &Self::Instance,
        window: &NativeWindow,
    ) -> Result<Self::Surface>;

    /// Select a physical device able to present to `surface` and open it.
    fn create_device(
        &mut self,
        instance: &Self::Instance,
        surface: &Self::Surface,
        config: &DeviceConfig,
    ) -> Result<Self::Device>;

    /// Negotiate and build a swapchain. `old` is handed to the driver for
    /// retirement but stays owned by the caller.
    fn create_swapchain(
        &mut self,
        device: &Self::Device,
        surface: &Self::Surface,
        request: &SwapchainRequest,
        old: Option<&Self::Swapchain>,
    ) -> Result<Self::Swapchain>;

    /// Block until the device has finished all submitted work.
    fn wait_idle(&mut self, device: &Self::Device) -> Result<()>;

    /// # Safety
    /// The swapchain must not be in use by the device.
    unsafe fn destroy_swapchain(&mut self, device: &Self::Device, swapchain: Self::Swapchain);

    /// # Safety
    /// Every swapchain created from `device` must already be destroyed.
    unsafe fn destroy_device(&mut self, device: Self::Device);

    /// # Safety
    /// Every swapchain created for `surface` must already be destroyed.
    unsafe fn destroy_surface(&mut self, surface: Self::Surface);

    /// # Safety
    /// Every surface and device created from `instance` must already be destroyed.
    unsafe fn destroy_instance(&mut self, instance: Self::Instance);
}

/// Vulkan through `ash`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VulkanApi;

impl GpuApi for VulkanApi {
    type Instance = VulkanInstance;
    type Surface = VulkanSurface;
    type Device = VulkanDevice;
    type Swapchain = Swapchain;

    fn create_instance(
        &mut self,
        config: &InstanceConfig,
        window: &NativeWindow,
    ) -> Result<VulkanInstance> {
        VulkanInstance::new(config, window.display)
    }

    fn create_surface(
        &mut self,
        instance: &VulkanInstance,
        window: &NativeWindow,
    ) -> Result<VulkanSurface> {
        VulkanSurface::new(instance, window)
    }

    fn create_device(
        &mut self,
        instance: &VulkanInstance,
        surface: &VulkanSurface,
        config: &DeviceConfig,
    ) -> Result<VulkanDevice> {
        VulkanDevice::new(instance, surface, config)
    }

    fn create_swapchain(
        &mut self,
        device: &VulkanDevice,
        surface: &VulkanSurface,
        request: &SwapchainRequest,
        old: Option<&Swapchain>,
    ) -> Result<Swapchain> {
        Swapchain::new(device, surface, request, old)
    }

    fn wait_idle(&mut self, device: &VulkanDevice) -> Result<()> {
        device.wait_idle()
    }

    unsafe fn destroy_swapchain(&mut self, device: &VulkanDevice, swapchain: Swapchain) {
        // SAFETY: forwarded from the caller.
        unsafe { swapchain.destroy(device) }
    }

    unsafe fn destroy_device(&mut self, device: VulkanDevice) {
        // SAFETY: forwarded from the caller.
        unsafe { device.destroy() }
    }

    unsafe fn destroy_surface(&mut self, surface: VulkanSurface) {
        // SAFETY: forwarded from the caller.
        unsafe { surface.destroy() }
    }

    unsafe fn destroy_instance(&mut self, instance: VulkanInstance) {
        // SAFETY: forwarded from the caller.
        unsafe { instance.destroy() }
    }
}
