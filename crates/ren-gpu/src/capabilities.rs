//! Physical device capability detection.

use std::collections::HashSet;
use std::ffi::{CStr, CString};

use ash::vk;

use crate::error::Result;
use crate::surface::VulkanSurface;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// What one queue family offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueFamilySupport {
    /// Supports graphics operations.
    pub graphics: bool,
    /// Can present to the surface the device was queried against.
    pub present: bool,
    /// Number of queues in the family.
    pub queue_count: u32,
}

/// Read-only descriptor of one physical device, as seen from a given surface.
#[derive(Debug, Clone)]
pub struct PhysicalDeviceInfo {
    /// Device name
    pub name: String,
    /// GPU vendor
    pub vendor: GpuVendor,
    pub device_type: vk::PhysicalDeviceType,
    /// Vulkan API version
    pub api_version: u32,
    /// Queue families, indexed by family index.
    pub queue_families: Vec<QueueFamilySupport>,
    // Available extensions
    pub extensions: HashSet<String>,
}

impl PhysicalDeviceInfo {
    /// Query a physical device against `surface`.
    ///
    /// # Safety
    /// `physical_device` must have been enumerated from `instance`, and `surface`
    /// must belong to the same instance.
    pub unsafe fn query(
        instance: &ash::Instance,
        surface: &VulkanSurface,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        // SAFETY: caller guarantees the handles are valid.
        let (properties, families, extensions) = unsafe {
            (
                instance.get_physical_device_properties(physical_device),
                instance.get_physical_device_queue_family_properties(physical_device),
                instance.enumerate_device_extension_properties(physical_device)?,
            )
        };

        let extensions: HashSet<String> = extensions
            .iter()
            .filter_map(|ext| {
                // SAFETY: the driver returns NUL-terminated fixed-size names
                unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                    .to_str()
                    .ok()
                    .map(String::from)
            })
            .collect();

        let mut queue_families = Vec::with_capacity(families.len());
        for (index, family) in (0u32..).zip(families.iter()) {
            queue_families.push(QueueFamilySupport {
                graphics: family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
                present: surface.supports_present(physical_device, index)?,
                queue_count: family.queue_count,
            });
        }

        // SAFETY: device_name is a NUL-terminated fixed-size array
        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        Ok(Self {
            name,
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_type: properties.device_type,
            api_version: properties.api_version,
            queue_families,
            extensions,
        })
    }

    /// Whether the device reports `extension`.
    pub fn supports_extension(&self, extension: &CStr) -> bool {
        extension
            .to_str()
            .is_ok_and(|name| self.extensions.contains(name))
    }

    /// Whether the device reports every one of `extensions`.
    pub fn supports_extensions(&self, extensions: &[CString]) -> bool {
        extensions.iter().all(|ext| self.supports_extension(ext))
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{}",
            self.name,
            self.vendor,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
        )
    }
}
