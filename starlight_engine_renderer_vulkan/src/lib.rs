/*!
# Starlight Engine - Vulkan Transfer Backend

Vulkan implementation of the `starlight_engine` device traits, using Ash for
the Vulkan bindings and gpu-allocator for memory management.

The application creates the instance and logical device (with the transfer
queues it wants to dedicate to uploads) and hands them to
[`VulkanTransferDevice::new`]. The resulting device is then shared with a
`DeviceContext` or a `TransferWorker`.
*/

mod vulkan_context;
mod vulkan_format;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_semaphore;
mod vulkan_transfer_queue;
mod vulkan_transfer_device;

pub use vulkan_context::GpuContext;
pub use vulkan_buffer::VulkanBuffer;
pub use vulkan_texture::VulkanTexture;
pub use vulkan_semaphore::VulkanSemaphore;
pub use vulkan_transfer_queue::{VulkanCommandSlot, VulkanTransferQueue};
pub use vulkan_transfer_device::{select_transfer_queues, TransferQueueSelection, VulkanTransferDevice};
