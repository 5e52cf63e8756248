//! Viewer application: reports the negotiated context and follows resizes.

use tracing::info;

use ren_app::{AppContext, RenApp};
use ren_gpu::device::describe_extensions;
use ren_gpu::Swapchain;

pub struct Viewer {
    recreations: u32,
}

impl RenApp for Viewer {
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
        if let Some(instance) = ctx.gpu.instance() {
            info!(
                validation = instance.validation_enabled(),
                extensions = %describe_extensions(instance.enabled_extensions()),
                "Instance"
            );
        }
        if let Some(device) = ctx.gpu.device() {
            let families = device.queue_families();
            info!(
                graphics = families.graphics,
                present = families.present,
                shared = families.is_shared(),
                "Queue families"
            );
        }
        if let Some(swapchain) = ctx.gpu.swapchain() {
            log_swapchain(swapchain);
        }
        Ok(Self { recreations: 0 })
    }

    fn on_resize(&mut self, ctx: &mut AppContext, _width: u32, _height: u32) -> anyhow::Result<()> {
        self.recreations += 1;
        if let Some(swapchain) = ctx.gpu.swapchain() {
            log_swapchain(swapchain);
        }
        Ok(())
    }

    fn cleanup(&mut self, _ctx: &mut AppContext) {
        info!("Swapchain recreated {} times", self.recreations);
    }
}

fn log_swapchain(swapchain: &Swapchain) {
    let extent = swapchain.extent();
    info!(
        width = extent.width,
        height = extent.height,
        images = swapchain.images().len(),
        format = ?swapchain.format(),
        present_mode = ?swapchain.present_mode(),
        "Swapchain"
    );
}
