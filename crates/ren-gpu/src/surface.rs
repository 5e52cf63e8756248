//! Surface binding for windowed rendering.
//!
//! Translates a platform window into a Vulkan surface, hiding the
//! raw-window-handle plumbing from the rest of the crate.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};

use crate::error::{GpuError, Result};
use crate::instance::VulkanInstance;

/// Raw handles of the window a surface is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeWindow {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

impl NativeWindow {
    pub fn new(display: RawDisplayHandle, window: RawWindowHandle) -> Self {
        Self { display, window }
    }

    /// Capture the raw handles of `window`.
    pub fn from_window<W>(window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window.display_handle().map_err(|e| {
            GpuError::SurfaceCreationFailed(format!("Failed to get display handle: {e}"))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            GpuError::SurfaceCreationFailed(format!("Failed to get window handle: {e}"))
        })?;

        Ok(Self::new(display.as_raw(), window_handle.as_raw()))
    }
}

/// A Vulkan surface bound to one window.
pub struct VulkanSurface {
    surface: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl VulkanSurface {
    /// Bind `window` to the instance's presentation subsystem.
    pub fn new(instance: &VulkanInstance, window: &NativeWindow) -> Result<Self> {
        // SAFETY: the instance is alive and was created with the platform's
        // surface extensions; the handles come from a live window.
        let surface = unsafe {
            ash_window::create_surface(
                instance.entry(),
                instance.instance(),
                window.display,
                window.window,
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreationFailed(e.to_string()))?;

        tracing::debug!("Surface created");

        Ok(Self {
            surface,
            loader: instance.surface_loader().clone(),
        })
    }

    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Whether `queue_family` of `physical_device` can present to this surface.
    pub fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> Result<bool> {
        // SAFETY: surface and physical device belong to the same live instance.
        let supported = unsafe {
            self.loader
                .get_physical_device_surface_support(physical_device, queue_family, self.surface)?
        };
        Ok(supported)
    }

    /// Query what the surface supports on `physical_device`.
    pub fn capabilities(&self, physical_device: vk::PhysicalDevice) -> Result<SurfaceCapabilities> {
        // SAFETY: surface and physical device belong to the same live instance.
        unsafe {
            let capabilities = self
                .loader
                .get_physical_device_surface_capabilities(physical_device, self.surface)?;
            let formats = self
                .loader
                .get_physical_device_surface_formats(physical_device, self.surface)?;
            let present_modes = self
                .loader
                .get_physical_device_surface_present_modes(physical_device, self.surface)?;

            Ok(SurfaceCapabilities {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// No swapchain created for this surface may still exist.
    pub unsafe fn destroy(self) {
        // SAFETY: caller guarantees the surface has no dependent swapchain.
        unsafe { self.loader.destroy_surface(self.surface, None) };
        tracing::debug!("Surface destroyed");
    }
}

/// Surface capabilities query result.
#[derive(Debug, Clone, Default)]
pub struct SurfaceCapabilities {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}
