//! Swapchain negotiation and creation.

use ash::vk;

use crate::device::VulkanDevice;
use crate::error::{GpuError, Result};
use crate::surface::{SurfaceCapabilities, VulkanSurface};

/// Swapchain-stage settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapchainConfig {
    /// Force FIFO presentation.
    pub vsync: bool,
    /// Preferred image count; `None` requests `min_image_count + 1`.
    pub image_count: Option<u32>,
}

/// Everything the swapchain builder needs from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainRequest {
    /// Extent to use when the surface lets the application choose.
    pub extent: vk::Extent2D,
    pub vsync: bool,
    pub image_count: Option<u32>,
}

impl SwapchainRequest {
    pub fn new(config: SwapchainConfig, width: u32, height: u32) -> Self {
        Self {
            extent: vk::Extent2D { width, height },
            vsync: config.vsync,
            image_count: config.image_count,
        }
    }
}

/// Parameters negotiated against the surface capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainPlan {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub image_count: u32,
    pub extent: vk::Extent2D,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub image_usage: vk::ImageUsageFlags,
}

impl SwapchainPlan {
    /// Negotiate a swapchain configuration for `request` against `support`.
    pub fn negotiate(support: &SurfaceCapabilities, request: &SwapchainRequest) -> Result<Self> {
        let caps = &support.capabilities;

        let format = select_surface_format(&support.formats).ok_or_else(|| {
            GpuError::SwapchainCreationFailed("surface reports no formats".into())
        })?;

        let extent = calculate_extent(caps, request.extent.width, request.extent.height);
        if extent.width == 0 || extent.height == 0 {
            return Err(GpuError::SwapchainCreationFailed(format!(
                "zero-sized extent {}x{}",
                extent.width, extent.height
            )));
        }

        let requested_images = request
            .image_count
            .unwrap_or_else(|| caps.min_image_count.saturating_add(1));

        // Transfer destination is only requested when the surface allows it
        let image_usage = vk::ImageUsageFlags::COLOR_ATTACHMENT
            | (caps.supported_usage_flags & vk::ImageUsageFlags::TRANSFER_DST);

        Ok(Self {
            format,
            present_mode: select_present_mode(&support.present_modes, request.vsync),
            image_count: clamp_image_count(requested_images, caps),
            extent,
            pre_transform: caps.current_transform,
            composite_alpha: select_composite_alpha(caps.supported_composite_alpha),
            image_usage,
        })
    }
}

/// Select the surface format: 8-bit sRGB if offered, otherwise the first reported.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|f| {
            matches!(f.format, vk::Format::B8G8R8A8_SRGB | vk::Format::R8G8B8A8_SRGB)
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| available.first())
        .copied()
}

/// Select the present mode: mailbox when available and vsync is off, otherwise FIFO.
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if !vsync && available.contains(&vk::PresentModeKHR::MAILBOX) {
        return vk::PresentModeKHR::MAILBOX;
    }
    // FIFO is always supported
    vk::PresentModeKHR::FIFO
}

/// Clamp `requested` into the surface's image count range. A maximum of zero means unbounded.
pub fn clamp_image_count(requested: u32, capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = requested.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Calculate swapchain extent.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width.max(capabilities.min_image_extent.width),
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height.max(capabilities.min_image_extent.height),
            ),
        }
    }
}

fn select_composite_alpha(supported: vk::CompositeAlphaFlagsKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::INHERIT,
    ]
    .into_iter()
    .find(|&mode| supported.contains(mode))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

/// How the caller should react to an acquire or present result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    /// Keep presenting.
    Ok,
    /// The surface changed; rebuild the swapchain only.
    Recreate,
    /// The surface or device is gone; tear down and bootstrap again.
    Rebootstrap,
    /// Unrecoverable.
    Fatal(vk::Result),
}

impl PresentStatus {
    /// Classify the result of `vkAcquireNextImageKHR` / `vkQueuePresentKHR`.
    ///
    /// `suboptimal` is the boolean ash returns on success.
    pub fn classify(result: std::result::Result<bool, vk::Result>) -> Self {
        match result {
            Ok(false) => Self::Ok,
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Self::Recreate,
            Err(vk::Result::ERROR_SURFACE_LOST_KHR | vk::Result::ERROR_DEVICE_LOST) => {
                Self::Rebootstrap
            }
            Err(other) => Self::Fatal(other),
        }
    }
}

/// Swapchain with its images and views.
pub struct Swapchain {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    plan: SwapchainPlan,
}

impl Swapchain {
    /// Negotiate and create a swapchain for `surface`.
    ///
    /// `old` is retired by the driver; the caller still owns and must destroy it.
    pub fn new(
        device: &VulkanDevice,
        surface: &VulkanSurface,
        request: &SwapchainRequest,
        old: Option<&Self>,
    ) -> Result<Self> {
        let support = surface.capabilities(device.physical_device())?;
        let plan = SwapchainPlan::negotiate(&support, request)?;

        let families = device.queue_families();
        let family_indices = families.unique();
        let sharing_mode = if families.is_shared() {
            vk::SharingMode::EXCLUSIVE
        } else {
            vk::SharingMode::CONCURRENT
        };

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle())
            .min_image_count(plan.image_count)
            .image_format(plan.format.format)
            .image_color_space(plan.format.color_space)
            .image_extent(plan.extent)
            .image_array_layers(1)
            .image_usage(plan.image_usage)
            .image_sharing_mode(sharing_mode)
            .pre_transform(plan.pre_transform)
            .composite_alpha(plan.composite_alpha)
            .present_mode(plan.present_mode)
            .clipped(true)
            .old_swapchain(old.map_or_else(vk::SwapchainKHR::null, Self::handle));
        if sharing_mode == vk::SharingMode::CONCURRENT {
            create_info = create_info.queue_family_indices(&family_indices);
        }

        let loader = device.swapchain_loader();
        // SAFETY: device and surface are alive; all pointers outlive the call.
        let swapchain = unsafe { loader.create_swapchain(&create_info, None) }
            .map_err(|e| GpuError::SwapchainCreationFailed(e.to_string()))?;

        // SAFETY: the swapchain was just created from this loader.
        let images = match unsafe { loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                // SAFETY: nothing references the new swapchain yet.
                unsafe { loader.destroy_swapchain(swapchain, None) };
                return Err(GpuError::SwapchainCreationFailed(e.to_string()));
            }
        };

        let mut image_views = Vec::with_capacity(images.len());
        for &image in &images {
            match create_image_view(device.device(), image, plan.format.format) {
                Ok(view) => image_views.push(view),
                Err(e) => {
                    // SAFETY: the views and swapchain were created above and are unused.
                    unsafe {
                        for &view in &image_views {
                            device.device().destroy_image_view(view, None);
                        }
                        loader.destroy_swapchain(swapchain, None);
                    }
                    return Err(GpuError::SwapchainCreationFailed(format!(
                        "image view creation failed: {e}"
                    )));
                }
            }
        }

        tracing::info!(
            width = plan.extent.width,
            height = plan.extent.height,
            images = images.len(),
            format = ?plan.format.format,
            present_mode = ?plan.present_mode,
            "Swapchain created"
        );

        Ok(Self {
            swapchain,
            images,
            image_views,
            plan,
        })
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// One color view per swapchain image, in image order.
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn format(&self) -> vk::Format {
        self.plan.format.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.plan.extent
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.plan.present_mode
    }

    /// The negotiated parameters this swapchain was built with.
    pub fn plan(&self) -> &SwapchainPlan {
        &self.plan
    }

    /// Destroy the image views and the swapchain.
    ///
    /// # Safety
    /// The swapchain and its images must not be in use by the GPU.
    pub unsafe fn destroy(self, device: &VulkanDevice) {
        // SAFETY: caller guarantees the swapchain is idle.
        unsafe {
            for &view in &self.image_views {
                device.device().destroy_image_view(view, None);
            }
            device
                .swapchain_loader()
                .destroy_swapchain(self.swapchain, None);
        }
        tracing::debug!("Swapchain destroyed");
    }
}

fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        );

    // SAFETY: image belongs to a live swapchain on this device.
    let view = unsafe { device.create_image_view(&view_info, None)? };
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RGBA8: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::R8G8B8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    const SRGB8: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        }
    }

    fn support(formats: Vec<vk::SurfaceFormatKHR>) -> SurfaceCapabilities {
        SurfaceCapabilities {
            capabilities: caps(2, 8),
            formats,
            present_modes: vec![vk::PresentModeKHR::FIFO],
        }
    }

    fn request(width: u32, height: u32) -> SwapchainRequest {
        SwapchainRequest::new(SwapchainConfig::default(), width, height)
    }

    #[test]
    fn srgb_format_is_preferred() {
        assert_eq!(select_surface_format(&[RGBA8, SRGB8]), Some(SRGB8));
        assert_eq!(select_surface_format(&[RGBA8]), Some(RGBA8));
        assert_eq!(select_surface_format(&[]), None);
    }

    #[test]
    fn srgb_format_needs_srgb_color_space() {
        let extended = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        };
        assert_eq!(select_surface_format(&[extended, RGBA8]), Some(extended));
    }

    #[test]
    fn mailbox_preferred_over_fifo() {
        let modes = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
        ];
        assert_eq!(select_present_mode(&modes, false), vk::PresentModeKHR::MAILBOX);
        assert_eq!(select_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn fifo_only_falls_back_gracefully() {
        assert_eq!(
            select_present_mode(&[vk::PresentModeKHR::FIFO], false),
            vk::PresentModeKHR::FIFO
        );
        assert_eq!(
            select_present_mode(&[vk::PresentModeKHR::IMMEDIATE], false),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn image_count_stays_within_bounds() {
        for (min, max) in [(1, 3), (2, 2), (2, 8), (3, 0)] {
            let caps = caps(min, max);
            for requested in 0..12 {
                let count = clamp_image_count(requested, &caps);
                assert!(count >= min, "{count} < min {min}");
                if max > 0 {
                    assert!(count <= max, "{count} > max {max}");
                }
                let feasible = max == 0 || requested <= max;
                if feasible {
                    assert!(count >= requested, "{count} < requested {requested}");
                }
            }
        }
    }

    #[test]
    fn default_image_count_is_min_plus_one() {
        let plan = SwapchainPlan::negotiate(&support(vec![SRGB8]), &request(800, 600)).unwrap();
        assert_eq!(plan.image_count, 3);

        let mut capped = support(vec![SRGB8]);
        capped.capabilities = caps(2, 2);
        let plan = SwapchainPlan::negotiate(&capped, &request(800, 600)).unwrap();
        assert_eq!(plan.image_count, 2);
    }

    #[test]
    fn fixed_surface_extent_wins() {
        let mut caps = caps(2, 3);
        caps.current_extent = vk::Extent2D {
            width: 1024,
            height: 768,
        };
        assert_eq!(
            calculate_extent(&caps, 640, 480),
            vk::Extent2D {
                width: 1024,
                height: 768
            }
        );
    }

    #[test]
    fn free_extent_is_clamped() {
        let caps = caps(2, 3);
        assert_eq!(
            calculate_extent(&caps, 8000, 0),
            vk::Extent2D {
                width: 4096,
                height: 1
            }
        );
        assert_eq!(
            calculate_extent(&caps, 800, 600),
            vk::Extent2D {
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn zero_extent_is_rejected() {
        let mut minimized = support(vec![SRGB8]);
        minimized.capabilities.current_extent = vk::Extent2D {
            width: 0,
            height: 0,
        };
        let err = SwapchainPlan::negotiate(&minimized, &request(800, 600)).unwrap_err();
        assert!(matches!(err, GpuError::SwapchainCreationFailed(_)));
    }

    #[test]
    fn empty_format_list_is_rejected() {
        let err = SwapchainPlan::negotiate(&support(vec![]), &request(800, 600)).unwrap_err();
        assert!(matches!(err, GpuError::SwapchainCreationFailed(_)));
    }

    #[test]
    fn usage_adds_transfer_dst_only_when_supported() {
        let plan = SwapchainPlan::negotiate(&support(vec![SRGB8]), &request(800, 600)).unwrap();
        assert_eq!(plan.image_usage, vk::ImageUsageFlags::COLOR_ATTACHMENT);

        let mut with_transfer = support(vec![SRGB8]);
        with_transfer.capabilities.supported_usage_flags |= vk::ImageUsageFlags::TRANSFER_DST;
        let plan = SwapchainPlan::negotiate(&with_transfer, &request(800, 600)).unwrap();
        assert!(plan.image_usage.contains(vk::ImageUsageFlags::TRANSFER_DST));
    }

    #[test]
    fn composite_alpha_prefers_opaque() {
        assert_eq!(
            select_composite_alpha(
                vk::CompositeAlphaFlagsKHR::INHERIT | vk::CompositeAlphaFlagsKHR::OPAQUE
            ),
            vk::CompositeAlphaFlagsKHR::OPAQUE
        );
        assert_eq!(
            select_composite_alpha(vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED),
            vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED
        );
    }

    #[test]
    fn present_results_are_classified() {
        assert_eq!(PresentStatus::classify(Ok(false)), PresentStatus::Ok);
        assert_eq!(PresentStatus::classify(Ok(true)), PresentStatus::Recreate);
        assert_eq!(
            PresentStatus::classify(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)),
            PresentStatus::Recreate
        );
        assert_eq!(
            PresentStatus::classify(Err(vk::Result::ERROR_SURFACE_LOST_KHR)),
            PresentStatus::Rebootstrap
        );
        assert_eq!(
            PresentStatus::classify(Err(vk::Result::ERROR_DEVICE_LOST)),
            PresentStatus::Rebootstrap
        );
        assert_eq!(
            PresentStatus::classify(Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY)),
            PresentStatus::Fatal(vk::Result::ERROR_OUT_OF_HOST_MEMORY)
        );
    }
}
