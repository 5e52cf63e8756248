//! Render context: runs the bootstrap stages in order and owns their results.

use std::fmt;

use ash::vk;

use crate::api::{GpuApi, VulkanApi};
use crate::device::DeviceConfig;
use crate::error::{BootstrapError, GpuError, Stage};
use crate::instance::InstanceConfig;
use crate::surface::NativeWindow;
use crate::swapchain::{SwapchainConfig, SwapchainRequest};

/// Lifecycle of a [`RenderContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    InstanceReady,
    SurfaceReady,
    DeviceReady,
    SwapchainReady,
    /// A recreate failed; the previous swapchain is retired and must be rebuilt.
    SwapchainStale,
    /// Bootstrap stopped at this stage. Earlier stages were released.
    Failed(Stage),
    Destroyed,
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::InstanceReady => f.write_str("instance ready"),
            Self::SurfaceReady => f.write_str("surface ready"),
            Self::DeviceReady => f.write_str("device ready"),
            Self::SwapchainReady => f.write_str("swapchain ready"),
            Self::SwapchainStale => f.write_str("swapchain stale"),
            Self::Failed(stage) => write!(f, "failed at {stage}"),
            Self::Destroyed => f.write_str("destroyed"),
        }
    }
}

/// Per-stage settings for [`RenderContext::bootstrap`].
#[derive(Debug, Clone, Default)]
pub struct BootstrapConfig {
    pub instance: InstanceConfig,
    pub device: DeviceConfig,
    pub swapchain: SwapchainConfig,
}

struct Stages<A: GpuApi> {
    instance: A::Instance,
    surface: A::Surface,
    device: A::Device,
    /// `None` only while stale, after the retired swapchain was released.
    swapchain: Option<A::Swapchain>,
}

/// Sole owner of the instance, surface, device and swapchain.
///
/// A value of this type only exists once every stage has succeeded. Resources
/// are released in reverse creation order by [`teardown`](Self::teardown),
/// which `Drop` also calls.
pub struct RenderContext<A: GpuApi = VulkanApi> {
    api: A,
    stages: Option<Stages<A>>,
    state: BootstrapState,
    config: BootstrapConfig,
}

impl<A: GpuApi> RenderContext<A> {
    /// Run every stage against `window`.
    ///
    /// On failure the stages that already succeeded are released in reverse
    /// order and the failing stage is reported.
    pub fn bootstrap(
        mut api: A,
        window: &NativeWindow,
        extent: vk::Extent2D,
        config: &BootstrapConfig,
    ) -> Result<Self, BootstrapError> {
        let mut state = BootstrapState::Uninitialized;

        let instance = match api.create_instance(&config.instance, window) {
            Ok(instance) => instance,
            Err(e) => return Err(fail(Stage::Instance, e)),
        };
        advance(&mut state, BootstrapState::InstanceReady);

        let surface = match api.create_surface(&instance, window) {
            Ok(surface) => surface,
            Err(e) => {
                // SAFETY: nothing was created from the instance.
                unsafe { api.destroy_instance(instance) };
                return Err(fail(Stage::Surface, e));
            }
        };
        advance(&mut state, BootstrapState::SurfaceReady);

        let device = match api.create_device(&instance, &surface, &config.device) {
            Ok(device) => device,
            Err(e) => {
                // SAFETY: no swapchain exists; release in reverse order.
                unsafe {
                    api.destroy_surface(surface);
                    api.destroy_instance(instance);
                }
                return Err(fail(Stage::Device, e));
            }
        };
        advance(&mut state, BootstrapState::DeviceReady);

        let request = SwapchainRequest::new(config.swapchain, extent.width, extent.height);
        let swapchain = match api.create_swapchain(&device, &surface, &request, None) {
            Ok(swapchain) => swapchain,
            Err(e) => {
                // SAFETY: the device has no submitted work and no swapchain.
                unsafe {
                    api.destroy_device(device);
                    api.destroy_surface(surface);
                    api.destroy_instance(instance);
                }
                return Err(fail(Stage::Swapchain, e));
            }
        };
        advance(&mut state, BootstrapState::SwapchainReady);

        Ok(Self {
            api,
            stages: Some(Stages {
                instance,
                surface,
                device,
                swapchain: Some(swapchain),
            }),
            state,
            config: config.clone(),
        })
    }

    /// Rebuild only the swapchain for a new window size.
    ///
    /// The new swapchain is created from the current one and the old one is
    /// released afterwards. On failure the context becomes
    /// [`BootstrapState::SwapchainStale`] and a later call may retry.
    pub fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<(), BootstrapError> {
        let Some(stages) = self.stages.as_mut() else {
            return Err(BootstrapError::new(Stage::Swapchain, GpuError::ContextDestroyed));
        };

        self.api
            .wait_idle(&stages.device)
            .map_err(BootstrapError::at(Stage::Swapchain))?;

        // A retired swapchain cannot be passed as the old one again
        if self.state == BootstrapState::SwapchainStale {
            if let Some(retired) = stages.swapchain.take() {
                // SAFETY: the device is idle.
                unsafe { self.api.destroy_swapchain(&stages.device, retired) };
            }
        }

        let request = SwapchainRequest::new(self.config.swapchain, width, height);
        let created = self.api.create_swapchain(
            &stages.device,
            &stages.surface,
            &request,
            stages.swapchain.as_ref(),
        );

        match created {
            Ok(swapchain) => {
                if let Some(old) = stages.swapchain.replace(swapchain) {
                    // SAFETY: the device is idle and the old swapchain was retired.
                    unsafe { self.api.destroy_swapchain(&stages.device, old) };
                }
                self.state = BootstrapState::SwapchainReady;
                tracing::debug!(width, height, "Swapchain recreated");
                Ok(())
            }
            Err(e) => {
                self.state = BootstrapState::SwapchainStale;
                tracing::warn!(width, height, "Swapchain recreate failed: {e}");
                Err(BootstrapError::new(Stage::Swapchain, e))
            }
        }
    }

    /// Release every stage in reverse creation order. Calling it again is a no-op.
    pub fn teardown(&mut self) {
        let Some(stages) = self.stages.take() else {
            return;
        };

        if let Err(e) = self.api.wait_idle(&stages.device) {
            tracing::warn!("wait_idle failed during teardown: {e}");
        }

        // SAFETY: the device is idle and each handle is released after its dependents.
        unsafe {
            if let Some(swapchain) = stages.swapchain {
                self.api.destroy_swapchain(&stages.device, swapchain);
            }
            self.api.destroy_device(stages.device);
            self.api.destroy_surface(stages.surface);
            self.api.destroy_instance(stages.instance);
        }

        self.state = BootstrapState::Destroyed;
        tracing::info!("Render context destroyed");
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// Whether the swapchain can be acquired from and presented to.
    pub fn is_presentable(&self) -> bool {
        self.state == BootstrapState::SwapchainReady
    }

    pub fn instance(&self) -> Option<&A::Instance> {
        self.stages.as_ref().map(|s| &s.instance)
    }

    pub fn surface(&self) -> Option<&A::Surface> {
        self.stages.as_ref().map(|s| &s.surface)
    }

    pub fn device(&self) -> Option<&A::Device> {
        self.stages.as_ref().map(|s| &s.device)
    }

    /// The current swapchain. `None` after teardown or while stale.
    pub fn swapchain(&self) -> Option<&A::Swapchain> {
        if !self.is_presentable() {
            return None;
        }
        self.stages.as_ref().and_then(|s| s.swapchain.as_ref())
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }
}

impl<A: GpuApi> Drop for RenderContext<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn advance(state: &mut BootstrapState, next: BootstrapState) {
    tracing::debug!(from = %state, to = %next, "Bootstrap transition");
    *state = next;
}

fn fail(stage: Stage, source: GpuError) -> BootstrapError {
    tracing::error!(state = %BootstrapState::Failed(stage), "Bootstrap failed: {source}");
    BootstrapError::new(stage, source)
}

/// Builder for creating a render context.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    config: BootstrapConfig,
    extent: vk::Extent2D,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            config: BootstrapConfig::default(),
            extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
        }
    }
}

impl ContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.instance.application_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.config.instance.enable_validation = enable;
        self
    }

    /// Initial window size in pixels.
    pub fn extent(mut self, width: u32, height: u32) -> Self {
        self.extent = vk::Extent2D { width, height };
        self
    }

    /// Force FIFO presentation.
    pub fn vsync(mut self, vsync: bool) -> Self {
        self.config.swapchain.vsync = vsync;
        self
    }

    /// Preferred swapchain image count.
    pub fn image_count(mut self, count: u32) -> Self {
        self.config.swapchain.image_count = Some(count);
        self
    }

    /// Require an additional instance extension.
    pub fn instance_extension(mut self, name: impl Into<String>) -> Self {
        self.config.instance.extensions.push(name.into());
        self
    }

    /// Require an additional device extension.
    pub fn device_extension(mut self, name: impl Into<String>) -> Self {
        self.config.device.extensions.push(name.into());
        self
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Bootstrap a Vulkan context for `window`.
    pub fn build(self, window: &NativeWindow) -> Result<RenderContext, BootstrapError> {
        self.build_with(VulkanApi, window)
    }

    /// Bootstrap through a custom [`GpuApi`].
    pub fn build_with<A: GpuApi>(
        self,
        api: A,
        window: &NativeWindow,
    ) -> Result<RenderContext<A>, BootstrapError> {
        RenderContext::bootstrap(api, window, self.extent, &self.config)
    }
}
