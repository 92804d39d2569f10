/// VulkanSemaphore - binary semaphore signalled by transfer submissions

use ash::vk;
use starlight_engine::engine_err;
use starlight_engine::starlight::device::Semaphore;
use starlight_engine::starlight::Result;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub struct VulkanSemaphore {
    ctx: Arc<GpuContext>,
    semaphore: vk::Semaphore,
}

impl VulkanSemaphore {
    pub(crate) fn create(ctx: &Arc<GpuContext>) -> Result<Self> {
        let semaphore = unsafe {
            ctx.device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| engine_err!("starlight::vulkan", "Failed to create semaphore: {:?}", e))?
        };
        Ok(Self { ctx: Arc::clone(ctx), semaphore })
    }

    /// Raw handle, to be waited on by the graphics submission using the resource
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Semaphore for VulkanSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
