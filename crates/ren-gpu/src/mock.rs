//! Recording [`GpuApi`] for orchestrator tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle};

use crate::api::GpuApi;
use crate::capabilities::{GpuVendor, PhysicalDeviceInfo, QueueFamilySupport};
use crate::device::{select_queried_device, DeviceConfig};
use crate::error::{GpuError, Result, Stage};
use crate::instance::InstanceConfig;
use crate::surface::{NativeWindow, SurfaceCapabilities};
use crate::swapchain::{SwapchainPlan, SwapchainRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Create(Stage, u64),
    Destroy(Stage, u64),
    WaitIdle,
}

/// State shared between a [`MockApi`] and the test driving it.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    /// Make creation of this stage fail.
    pub fail_at: Option<Stage>,
    /// Make every swapchain creation fail.
    pub fail_swapchain: bool,
    /// Surface-reported extent; `None` lets the request decide.
    pub fixed_extent: Option<vk::Extent2D>,
    next_id: u64,
}

impl Recorder {
    pub fn created(&self, stage: Stage) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, Event::Create(s, _) if *s == stage))
    }

    /// Every created handle has been destroyed exactly once.
    pub fn all_released(&self) -> bool {
        let created: HashSet<u64> = self
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Create(_, id) => Some(*id),
                _ => None,
            })
            .collect();
        let destroyed: Vec<u64> = self
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Destroy(_, id) => Some(*id),
                _ => None,
            })
            .collect();
        destroyed.len() == created.len() && destroyed.iter().all(|id| created.contains(id))
    }

    fn create(&mut self, stage: Stage) -> Result<u64> {
        if self.fail_at == Some(stage) || (stage == Stage::Swapchain && self.fail_swapchain) {
            return Err(match stage {
                Stage::Instance => GpuError::LoaderUnavailable("mock".into()),
                Stage::Surface => GpuError::SurfaceCreationFailed("mock".into()),
                Stage::Device => GpuError::DeviceCreationFailed("mock".into()),
                Stage::Swapchain => GpuError::SwapchainCreationFailed("mock".into()),
            });
        }
        self.next_id += 1;
        self.events.push(Event::Create(stage, self.next_id));
        Ok(self.next_id)
    }

    fn destroy(&mut self, stage: Stage, id: u64) {
        self.events.push(Event::Destroy(stage, id));
    }
}

#[derive(Debug)]
pub struct MockInstance {
    pub id: u64,
}

#[derive(Debug)]
pub struct MockSurface {
    pub id: u64,
}

#[derive(Debug)]
pub struct MockDevice {
    pub id: u64,
    /// Index of the selected physical device.
    pub index: usize,
}

#[derive(Debug)]
pub struct MockSwapchain {
    pub id: u64,
    pub old: Option<u64>,
    pub extent: vk::Extent2D,
}

pub struct MockApi {
    recorder: Rc<RefCell<Recorder>>,
    /// Per-device capability query results, in enumeration order.
    pub devices: Vec<Result<PhysicalDeviceInfo>>,
    pub support: SurfaceCapabilities,
}

impl MockApi {
    /// A mock with three devices: the first lacks swapchain support, the
    /// other two are both suitable.
    pub fn recording() -> (Self, Rc<RefCell<Recorder>>) {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let api = Self {
            recorder: Rc::clone(&recorder),
            devices: vec![
                Ok(device("No Swapchain", &[], true)),
                Ok(device("Integrated", &["VK_KHR_swapchain"], false)),
                Ok(device("Discrete", &["VK_KHR_swapchain"], true)),
            ],
            support: support(),
        };
        (api, recorder)
    }
}

impl GpuApi for MockApi {
    type Instance = MockInstance;
    type Surface = MockSurface;
    type Device = MockDevice;
    type Swapchain = MockSwapchain;

    fn create_instance(
        &mut self,
        _config: &InstanceConfig,
        _window: &NativeWindow,
    ) -> Result<MockInstance> {
        let id = self.recorder.borrow_mut().create(Stage::Instance)?;
        Ok(MockInstance { id })
    }

    fn create_surface(
        &mut self,
        _instance: &MockInstance,
        _window: &NativeWindow,
    ) -> Result<MockSurface> {
        let id = self.recorder.borrow_mut().create(Stage::Surface)?;
        Ok(MockSurface { id })
    }

    fn create_device(
        &mut self,
        _instance: &MockInstance,
        _surface: &MockSurface,
        config: &DeviceConfig,
    ) -> Result<MockDevice> {
        let (index, _) = select_queried_device(&self.devices, &config.required_extensions()?)?;
        let id = self.recorder.borrow_mut().create(Stage::Device)?;
        Ok(MockDevice { id, index })
    }

    fn create_swapchain(
        &mut self,
        _device: &MockDevice,
        _surface: &MockSurface,
        request: &SwapchainRequest,
        old: Option<&MockSwapchain>,
    ) -> Result<MockSwapchain> {
        let mut support = self.support.clone();
        if let Some(extent) = self.recorder.borrow().fixed_extent {
            support.capabilities.current_extent = extent;
        }
        let plan = SwapchainPlan::negotiate(&support, request)?;
        let id = self.recorder.borrow_mut().create(Stage::Swapchain)?;
        Ok(MockSwapchain {
            id,
            old: old.map(|s| s.id),
            extent: plan.extent,
        })
    }

    fn wait_idle(&mut self, _device: &MockDevice) -> Result<()> {
        self.recorder.borrow_mut().events.push(Event::WaitIdle);
        Ok(())
    }

    unsafe fn destroy_swapchain(&mut self, _device: &MockDevice, swapchain: MockSwapchain) {
        self.recorder
            .borrow_mut()
            .destroy(Stage::Swapchain, swapchain.id);
    }

    unsafe fn destroy_device(&mut self, device: MockDevice) {
        self.recorder.borrow_mut().destroy(Stage::Device, device.id);
    }

    unsafe fn destroy_surface(&mut self, surface: MockSurface) {
        self.recorder.borrow_mut().destroy(Stage::Surface, surface.id);
    }

    unsafe fn destroy_instance(&mut self, instance: MockInstance) {
        self.recorder
            .borrow_mut()
            .destroy(Stage::Instance, instance.id);
    }
}

pub fn test_window() -> NativeWindow {
    NativeWindow::new(
        RawDisplayHandle::Web(WebDisplayHandle::new()),
        RawWindowHandle::Web(WebWindowHandle::new(1)),
    )
}

/// A device with one graphics family and, if `shared`, presentation on the
/// same family; otherwise presentation lives on a second family.
fn device(name: &str, extensions: &[&str], shared: bool) -> PhysicalDeviceInfo {
    let queue_families = if shared {
        vec![QueueFamilySupport {
            graphics: true,
            present: true,
            queue_count: 4,
        }]
    } else {
        vec![
            QueueFamilySupport {
                graphics: true,
                present: false,
                queue_count: 4,
            },
            QueueFamilySupport {
                graphics: false,
                present: true,
                queue_count: 1,
            },
        ]
    };

    PhysicalDeviceInfo {
        name: name.to_string(),
        vendor: GpuVendor::Other(0),
        device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
        api_version: vk::API_VERSION_1_3,
        queue_families,
        extensions: extensions.iter().map(|&e| e.to_string()).collect(),
    }
}

fn support() -> SurfaceCapabilities {
    SurfaceCapabilities {
        capabilities: vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 8192,
                height: 8192,
            },
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        },
        formats: vec![vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }],
        present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
    }
}
