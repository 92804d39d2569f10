/// Vulkan transfer queue and command slots
///
/// Each `VulkanCommandSlot` owns its command pool, one primary command buffer
/// and the fence of its last submission. A slot without a successful
/// submission reports itself complete.

use ash::vk;
use starlight_engine::starlight::device::{
    Buffer, BufferCopyRegion, BufferTextureCopyRegion, CommandSlot, Semaphore, Texture, TransferQueue,
};
use starlight_engine::starlight::{Error, Result};
use starlight_engine::{engine_bail, engine_err};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_semaphore::VulkanSemaphore;
use crate::vulkan_texture::VulkanTexture;

fn as_vulkan_buffer(buffer: &Arc<dyn Buffer>) -> Result<&VulkanBuffer> {
    buffer
        .as_any()
        .downcast_ref::<VulkanBuffer>()
        .ok_or_else(|| Error::InvalidResource("buffer was not created by the Vulkan device".to_string()))
}

fn as_vulkan_texture(texture: &Arc<dyn Texture>) -> Result<&VulkanTexture> {
    texture
        .as_any()
        .downcast_ref::<VulkanTexture>()
        .ok_or_else(|| Error::InvalidResource("texture was not created by the Vulkan device".to_string()))
}

// ===== COMMAND SLOT =====

/// Command buffer plus fence, recorded and submitted by one transfer thread
pub struct VulkanCommandSlot {
    ctx: Arc<GpuContext>,
    pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    fence: vk::Fence,
    recording: bool,
    /// Set once `fence` guards a successful submission
    submitted: bool,
    /// Resources referenced by the recorded commands, released on reset
    buffers: Vec<Arc<dyn Buffer>>,
    textures: Vec<Arc<dyn Texture>>,
}

impl VulkanCommandSlot {
    fn create(ctx: &Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(ctx.queue_families.transfer);

            let pool = ctx.device.create_command_pool(&pool_create_info, None)
                .map_err(|e| engine_err!("starlight::vulkan", "Failed to create transfer command pool: {:?}", e))?;

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = match ctx.device.allocate_command_buffers(&alloc_info) {
                Ok(buffers) => buffers[0],
                Err(e) => {
                    ctx.device.destroy_command_pool(pool, None);
                    engine_bail!("starlight::vulkan", "Failed to allocate transfer command buffer: {:?}", e);
                }
            };

            let fence_create_info = vk::FenceCreateInfo::default()
                .flags(vk::FenceCreateFlags::empty());

            let fence = match ctx.device.create_fence(&fence_create_info, None) {
                Ok(fence) => fence,
                Err(e) => {
                    ctx.device.destroy_command_pool(pool, None);
                    engine_bail!("starlight::vulkan", "Failed to create transfer fence: {:?}", e);
                }
            };

            Ok(Self {
                ctx: Arc::clone(ctx),
                pool,
                command_buffer,
                fence,
                recording: false,
                submitted: false,
                buffers: Vec::new(),
                textures: Vec::new(),
            })
        }
    }

    fn ensure_recording(&self, command: &str) -> Result<()> {
        if !self.recording {
            engine_bail!("starlight::vulkan", "{} recorded outside begin/end", command);
        }
        Ok(())
    }

    /// Raw command buffer handle
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }
}

impl CommandSlot for VulkanCommandSlot {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!("starlight::vulkan", "begin called on a slot already recording");
        }

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.ctx.device.begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("starlight::vulkan", "Failed to begin transfer command buffer: {:?}", e))?;
        }
        self.recording = true;
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &Arc<dyn Buffer>,
        dst: &Arc<dyn Buffer>,
        region: BufferCopyRegion,
    ) -> Result<()> {
        self.ensure_recording("copy_buffer")?;
        let src_buffer = as_vulkan_buffer(src)?;
        let dst_buffer = as_vulkan_buffer(dst)?;

        let copy = vk::BufferCopy {
            src_offset: region.src_offset,
            dst_offset: region.dst_offset,
            size: region.size,
        };

        unsafe {
            self.ctx.device.cmd_copy_buffer(
                self.command_buffer,
                src_buffer.handle(),
                dst_buffer.handle(),
                &[copy],
            );
        }

        self.buffers.push(Arc::clone(src));
        self.buffers.push(Arc::clone(dst));
        Ok(())
    }

    fn copy_buffer_to_texture(
        &mut self,
        src: &Arc<dyn Buffer>,
        dst: &Arc<dyn Texture>,
        region: BufferTextureCopyRegion,
    ) -> Result<()> {
        self.ensure_recording("copy_buffer_to_texture")?;
        let src_buffer = as_vulkan_buffer(src)?;
        let texture = as_vulkan_texture(dst)?;
        let info = texture.info();

        let subresource_range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: region.base_layer,
            layer_count: region.layer_count,
        };

        unsafe {
            // UNDEFINED -> TRANSFER_DST_OPTIMAL
            let barrier_to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(texture.image())
                .subresource_range(subresource_range)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier_to_transfer],
            );

            let copy = vk::BufferImageCopy::default()
                .buffer_offset(region.buffer_offset)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: region.base_layer,
                    layer_count: region.layer_count,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D {
                    width: info.width,
                    height: info.height,
                    depth: 1,
                });

            self.ctx.device.cmd_copy_buffer_to_image(
                self.command_buffer,
                src_buffer.handle(),
                texture.image(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[copy],
            );

            // TRANSFER_DST_OPTIMAL -> SHADER_READ_ONLY_OPTIMAL
            // Visibility to the graphics queue comes from the signal semaphore.
            let barrier_to_shader = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(texture.image())
                .subresource_range(subresource_range)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::empty());

            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier_to_shader],
            );
        }

        self.buffers.push(Arc::clone(src));
        self.textures.push(Arc::clone(dst));
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            engine_bail!("starlight::vulkan", "end called on a slot that is not recording");
        }
        unsafe {
            self.ctx.device.end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("starlight::vulkan", "Failed to end transfer command buffer: {:?}", e))?;
        }
        self.recording = false;
        Ok(())
    }

    fn is_complete(&self) -> Result<bool> {
        if !self.submitted {
            return Ok(true);
        }
        unsafe {
            self.ctx.device.get_fence_status(self.fence)
                .map_err(|e| engine_err!("starlight::vulkan", "Failed to query transfer fence: {:?}", e))
        }
    }

    fn wait(&self, timeout: Option<Duration>) -> Result<bool> {
        if !self.submitted {
            return Ok(true);
        }
        let timeout_ns = timeout
            .map(|timeout| u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(u64::MAX);

        unsafe {
            match self.ctx.device.wait_for_fences(&[self.fence], true, timeout_ns) {
                Ok(()) => Ok(true),
                Err(vk::Result::TIMEOUT) => Ok(false),
                Err(e) => Err(engine_err!("starlight::vulkan", "Failed to wait for transfer fence: {:?}", e)),
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        unsafe {
            self.ctx.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("starlight::vulkan", "Failed to reset transfer command buffer: {:?}", e))?;
        }
        self.recording = false;
        self.buffers.clear();
        self.textures.clear();
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for VulkanCommandSlot {
    fn drop(&mut self) {
        unsafe {
            // A slot dropped mid-flight must not free a command buffer the GPU still reads
            if self.submitted {
                let _ = self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX);
            }
            self.ctx.device.destroy_fence(self.fence, None);
            self.ctx.device.destroy_command_pool(self.pool, None);
        }
    }
}

// ===== TRANSFER QUEUE =====

/// One `VkQueue` of the transfer family
///
/// Vulkan requires external synchronization of queue submissions; the queue
/// is owned by a single transfer thread.
pub struct VulkanTransferQueue {
    ctx: Arc<GpuContext>,
    queue: vk::Queue,
    index: u32,
}

impl VulkanTransferQueue {
    pub(crate) fn new(ctx: Arc<GpuContext>, queue: vk::Queue, index: u32) -> Self {
        Self { ctx, queue, index }
    }

    /// Raw queue handle
    pub fn handle(&self) -> vk::Queue {
        self.queue
    }
}

impl TransferQueue for VulkanTransferQueue {
    fn queue_index(&self) -> u32 {
        self.index
    }

    fn create_command_slot(&self) -> Result<Box<dyn CommandSlot>> {
        Ok(Box::new(VulkanCommandSlot::create(&self.ctx)?))
    }

    fn submit(&self, slot: &mut dyn CommandSlot, signal: Option<&Arc<dyn Semaphore>>) -> Result<()> {
        let slot = slot
            .as_any_mut()
            .downcast_mut::<VulkanCommandSlot>()
            .ok_or_else(|| Error::InvalidResource("command slot was not created by this queue".to_string()))?;
        if slot.recording {
            engine_bail!("starlight::vulkan", "submit called on a slot still recording");
        }

        let signal_semaphores: Vec<vk::Semaphore> = match signal {
            Some(semaphore) => {
                let semaphore = semaphore
                    .as_any()
                    .downcast_ref::<VulkanSemaphore>()
                    .ok_or_else(|| Error::InvalidResource("semaphore was not created by the Vulkan device".to_string()))?;
                vec![semaphore.handle()]
            }
            None => Vec::new(),
        };
        let command_buffers = [slot.command_buffer];

        slot.submitted = false;

        unsafe {
            self.ctx.device
                .reset_fences(&[slot.fence])
                .map_err(|e| engine_err!("starlight::vulkan", "Failed to reset transfer fence: {:?}", e))?;

            let submit_info = vk::SubmitInfo::default()
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            self.ctx.device
                .queue_submit(self.queue, &[submit_info], slot.fence)
                .map_err(|e| engine_err!("starlight::vulkan", "Failed to submit transfer commands: {:?}", e))?;
        }

        slot.submitted = true;
        Ok(())
    }
}
