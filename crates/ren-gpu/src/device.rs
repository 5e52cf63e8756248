//! Physical device selection and logical device creation.

use std::ffi::{c_char, CStr, CString};

use ash::vk;

use crate::capabilities::PhysicalDeviceInfo;
use crate::error::{GpuError, Result};
use crate::instance::{to_cstrings, VulkanInstance};
use crate::surface::VulkanSurface;

/// Must be enabled on devices that advertise it (MoltenVK).
const PORTABILITY_SUBSET: &CStr = c"VK_KHR_portability_subset";

/// Device-stage settings.
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// Device extensions required on top of `VK_KHR_swapchain`.
    pub extensions: Vec<String>,
}

impl DeviceConfig {
    /// Every extension a device must report, swapchain support first.
    pub fn required_extensions(&self) -> Result<Vec<CString>> {
        let mut required = vec![ash::khr::swapchain::NAME.to_owned()];
        for ext in to_cstrings(&self.extensions)? {
            if !required.contains(&ext) {
                required.push(ext);
            }
        }
        Ok(required)
    }
}

/// Queue family indices for graphics and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Whether one family serves both roles, so the queues alias.
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct families, graphics first.
    pub fn unique(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Find graphics and present families on `device`.
///
/// A family supporting both is preferred; otherwise the first of each is used.
pub fn find_queue_families(device: &PhysicalDeviceInfo) -> Option<QueueFamilyIndices> {
    let families = || (0u32..).zip(device.queue_families.iter());

    if let Some((index, _)) = families().find(|(_, f)| f.graphics && f.present) {
        return Some(QueueFamilyIndices {
            graphics: index,
            present: index,
        });
    }

    let graphics = families().find(|(_, f)| f.graphics).map(|(i, _)| i)?;
    let present = families().find(|(_, f)| f.present).map(|(i, _)| i)?;

    Some(QueueFamilyIndices { graphics, present })
}

/// Pick the first device, in enumeration order, that can draw, present and
/// reports every required extension.
pub fn select_physical_device(
    devices: &[PhysicalDeviceInfo],
    required_extensions: &[CString],
) -> Result<(usize, QueueFamilyIndices)> {
    devices
        .iter()
        .enumerate()
        .find_map(|(index, device)| {
            suitable_families(device, required_extensions).map(|families| (index, families))
        })
        .ok_or(GpuError::NoSuitablePhysicalDevice)
}

/// Like [`select_physical_device`], over per-device query results.
///
/// A device whose capability query failed is skipped; the returned index is
/// its position in `queried`.
pub fn select_queried_device(
    queried: &[Result<PhysicalDeviceInfo>],
    required_extensions: &[CString],
) -> Result<(usize, QueueFamilyIndices)> {
    queried
        .iter()
        .enumerate()
        .find_map(|(index, query)| match query {
            Ok(device) => {
                suitable_families(device, required_extensions).map(|families| (index, families))
            }
            Err(e) => {
                tracing::debug!(index, "Skipping device: capability query failed: {e}");
                None
            }
        })
        .ok_or(GpuError::NoSuitablePhysicalDevice)
}

fn suitable_families(
    device: &PhysicalDeviceInfo,
    required_extensions: &[CString],
) -> Option<QueueFamilyIndices> {
    if !device.supports_extensions(required_extensions) {
        tracing::debug!(
            device = %device.name,
            "Skipping device: missing required extensions"
        );
        return None;
    }
    let families = find_queue_families(device);
    if families.is_none() {
        tracing::debug!(
            device = %device.name,
            "Skipping device: no graphics or present queue family"
        );
    }
    families
}

/// Selected physical device with its logical device and queues.
pub struct VulkanDevice {
    physical_device: vk::PhysicalDevice,
    info: PhysicalDeviceInfo,
    device: ash::Device,
    swapchain_loader: ash::khr::swapchain::Device,
    queue_families: QueueFamilyIndices,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
}

impl VulkanDevice {
    /// Select a physical device for `surface` and create the logical device.
    pub fn new(
        instance: &VulkanInstance,
        surface: &VulkanSurface,
        config: &DeviceConfig,
    ) -> Result<Self> {
        let required = config.required_extensions()?;
        let vk_instance = instance.instance();

        // SAFETY: the instance is alive.
        let physical_devices = unsafe { vk_instance.enumerate_physical_devices()? };
        if physical_devices.is_empty() {
            tracing::warn!("No Vulkan physical devices enumerated");
        }

        let queried: Vec<Result<PhysicalDeviceInfo>> = physical_devices
            .iter()
            // SAFETY: each handle was just enumerated from this instance, and the
            // surface belongs to it.
            .map(|&pd| unsafe { PhysicalDeviceInfo::query(vk_instance, surface, pd) })
            .collect();

        let (index, queue_families) = select_queried_device(&queried, &required)?;
        let physical_device = physical_devices[index];
        let info = queried
            .into_iter()
            .nth(index)
            .and_then(std::result::Result::ok)
            .ok_or(GpuError::NoSuitablePhysicalDevice)?;

        tracing::info!("Selected GPU: {}", info.summary());

        let mut extensions = required;
        // Devices that advertise the portability subset must enable it
        if info.supports_extension(PORTABILITY_SUBSET) {
            extensions.push(PORTABILITY_SUBSET.to_owned());
        }
        let device =
            create_logical_device(vk_instance, physical_device, queue_families, &extensions)?;

        // SAFETY: both families were requested with one queue each.
        let (graphics_queue, present_queue) = unsafe {
            (
                device.get_device_queue(queue_families.graphics, 0),
                device.get_device_queue(queue_families.present, 0),
            )
        };

        let swapchain_loader = ash::khr::swapchain::Device::new(vk_instance, &device);

        tracing::debug!(
            graphics = queue_families.graphics,
            present = queue_families.present,
            "Logical device created"
        );

        Ok(Self {
            physical_device,
            info,
            device,
            swapchain_loader,
            queue_families,
            graphics_queue,
            present_queue,
        })
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Descriptor of the selected physical device.
    pub fn info(&self) -> &PhysicalDeviceInfo {
        &self.info
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    /// Queue for graphics submission.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Queue for presentation. Same handle as the graphics queue when the families match.
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        // SAFETY: the device is alive; the context drives it from a single thread.
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Destroy the logical device.
    ///
    /// # Safety
    /// Every swapchain and object created from this device must already be destroyed.
    pub unsafe fn destroy(self) {
        // SAFETY: caller guarantees no child objects remain.
        unsafe { self.device.destroy_device(None) };
        tracing::debug!("Logical device destroyed");
    }
}

fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_families: QueueFamilyIndices,
    extensions: &[CString],
) -> Result<ash::Device> {
    let queue_priority = [1.0_f32];
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = queue_families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priority)
        })
        .collect();

    let extension_names: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
    let features = vk::PhysicalDeviceFeatures::default();

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    // SAFETY: physical_device belongs to instance; all pointers outlive the call.
    unsafe { instance.create_device(physical_device, &create_info, None) }.map_err(|e| {
        GpuError::DeviceCreationFailed(format!(
            "{e} (extensions: {})",
            describe_extensions(extensions)
        ))
    })
}

/// Display name for an extension list, used in diagnostics.
pub fn describe_extensions(extensions: &[CString]) -> String {
    extensions
        .iter()
        .map(|e| e.to_string_lossy())
        .collect::<Vec<_>>()
        .join(", ")
}
