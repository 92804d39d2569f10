/// VulkanBuffer - Vulkan implementation of the Buffer trait

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use starlight_engine::starlight::device::{Buffer, BufferDesc, BufferUsage, MemoryLocation};
use starlight_engine::starlight::{Error, Result};
use starlight_engine::{engine_err, engine_error};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{buffer_usage_to_vk, memory_location_to_allocator};

/// Vulkan buffer implementation
pub struct VulkanBuffer {
    /// Shared GPU context (device, allocator)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    size: u64,
    usage: BufferUsage,
    location: MemoryLocation,
}

impl VulkanBuffer {
    /// Create the buffer, allocate and bind its memory
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            return Err(Error::InvalidResource("buffer size must be greater than zero".to_string()));
        }

        let (sharing_mode, families) = ctx.sharing();

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage))
                .sharing_mode(sharing_mode)
                .queue_family_indices(&families);

            let buffer = ctx.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("starlight::vulkan", "Failed to create buffer of size {} bytes: {:?}", desc.size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);

            let allocation = ctx.allocator()
                .and_then(|mut allocator| {
                    allocator.allocate(&AllocationCreateDesc {
                        name: "transfer buffer",
                        requirements,
                        location: memory_location_to_allocator(desc.location),
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!("starlight::vulkan", "Out of GPU memory for buffer (required: {:.2} MB)", size_mb);
                        Error::OutOfMemory
                    })
                });

            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.free(allocation);
                ctx.device.destroy_buffer(buffer, None);
                return Err(engine_err!("starlight::vulkan", "Failed to bind buffer memory: {:?}", e));
            }

            Ok(Self {
                ctx: Arc::clone(ctx),
                buffer,
                allocation: Some(allocation),
                size: desc.size,
                usage: desc.usage,
                location: desc.location,
            })
        }
    }

    /// Raw Vulkan handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Pointer to `len` mapped bytes at `offset`, validating the range
    fn mapped_range(&self, offset: u64, len: usize) -> Result<*mut u8> {
        if !self.location.is_host_visible() {
            return Err(Error::InvalidResource("buffer is not CPU-accessible".to_string()));
        }
        let end = offset.checked_add(len as u64).unwrap_or(u64::MAX);
        if end > self.size {
            return Err(Error::InvalidResource(format!(
                "range {}..{} is out of bounds for a buffer of {} bytes",
                offset, end, self.size
            )));
        }

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            engine_err!("starlight::vulkan", "Buffer access failed: no GPU allocation")
        })?;
        let mapped = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError("Buffer memory is not mapped".to_string()))?;

        unsafe { Ok((mapped.as_ptr() as *mut u8).add(offset as usize)) }
    }
}

impl Buffer for VulkanBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn location(&self) -> MemoryLocation {
        self.location
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let dst = self.mapped_range(offset, data.len())?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }

    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let src = self.mapped_range(offset, out.len())?;
        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, out.as_mut_ptr(), out.len());
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
