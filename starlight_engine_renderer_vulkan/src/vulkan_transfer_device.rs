/// VulkanTransferDevice - Vulkan implementation of the TransferDevice trait
///
/// Built on top of a logical device created by the application. The device
/// must have been created with `transfer_queue_count` queues of the transfer
/// family; each of them is handed to one transfer thread.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use starlight_engine::starlight::device::{
    Buffer, BufferDesc, QueueFamilies, Semaphore, Texture, TextureDesc, TransferDevice, TransferQueue,
};
use starlight_engine::starlight::{Error, Result};
use starlight_engine::{engine_error, engine_info};
use std::sync::{Arc, Mutex};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_semaphore::VulkanSemaphore;
use crate::vulkan_texture::VulkanTexture;
use crate::vulkan_transfer_queue::VulkanTransferQueue;

/// Queue families picked for transfers on a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferQueueSelection {
    pub families: QueueFamilies,
    /// Queues available in the transfer family
    pub transfer_queue_count: u32,
}

/// Pick the graphics family and the best transfer family of a physical device
///
/// A dedicated transfer family (TRANSFER without GRAPHICS) is preferred; the
/// graphics family is used otherwise. Returns `None` without a graphics family.
pub fn select_transfer_queues(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Option<TransferQueueSelection> {
    let properties = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    let graphics = properties
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))? as u32;

    let dedicated = properties.iter().position(|family| {
        family.queue_flags.contains(vk::QueueFlags::TRANSFER)
            && !family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
    });

    let transfer = dedicated.map(|index| index as u32).unwrap_or(graphics);

    Some(TransferQueueSelection {
        families: QueueFamilies { graphics, transfer },
        transfer_queue_count: properties[transfer as usize].queue_count.max(1),
    })
}

/// Transfer device over an application-owned `ash::Device`
pub struct VulkanTransferDevice {
    ctx: Arc<GpuContext>,
    /// Transfer queues, `None` once handed out
    queues: Mutex<Vec<Option<vk::Queue>>>,
}

impl VulkanTransferDevice {
    /// Create the transfer device
    ///
    /// # Arguments
    ///
    /// * `instance` - Vulkan instance the device was created from
    /// * `physical_device` - Physical device backing `device`
    /// * `device` - Logical device, destroyed by the caller after this object and
    ///   every resource created from it are dropped
    /// * `families` - Graphics and transfer queue family indices
    /// * `transfer_queue_count` - Number of queues created in the transfer family
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        families: QueueFamilies,
        transfer_queue_count: u32,
    ) -> Result<Self> {
        if transfer_queue_count == 0 {
            return Err(Error::InitializationFailed("no transfer queue available".to_string()));
        }

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            engine_error!("starlight::vulkan", "Failed to create GPU allocator: {:?}", e);
            Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
        })?;

        let queues = (0..transfer_queue_count)
            .map(|index| Some(unsafe { device.get_device_queue(families.transfer, index) }))
            .collect();

        engine_info!(
            "starlight::vulkan",
            "Transfer device ready: {} queue(s) on family {} (graphics family {}, {} sharing)",
            transfer_queue_count,
            families.transfer,
            families.graphics,
            if families.is_shared() { "concurrent" } else { "exclusive" }
        );

        Ok(Self {
            ctx: Arc::new(GpuContext::new(device, allocator, families)),
            queues: Mutex::new(queues),
        })
    }

    /// Shared context of every resource created by this device
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }
}

impl TransferDevice for VulkanTransferDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        Ok(Arc::new(VulkanBuffer::create(&self.ctx, desc)?))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        Ok(Arc::new(VulkanTexture::create(&self.ctx, desc)?))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(Arc::new(VulkanSemaphore::create(&self.ctx)?))
    }

    fn transfer_queue_count(&self) -> u32 {
        self.queues.lock().map(|queues| queues.len() as u32).unwrap_or(0)
    }

    fn create_transfer_queue(&self, index: u32) -> Result<Box<dyn TransferQueue>> {
        let mut queues = self.queues.lock()
            .map_err(|_| Error::BackendError("transfer queue table lock is poisoned".to_string()))?;

        let entry = queues.get_mut(index as usize).ok_or_else(|| {
            Error::InvalidResource(format!("transfer queue {} does not exist", index))
        })?;
        let queue = entry.take().ok_or_else(|| {
            Error::InvalidResource(format!("transfer queue {} is already in use", index))
        })?;

        Ok(Box::new(VulkanTransferQueue::new(Arc::clone(&self.ctx), queue, index)))
    }

    fn queue_families(&self) -> QueueFamilies {
        self.ctx.queue_families
    }
}
