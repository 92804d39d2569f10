/// Transfer device traits
///
/// The narrow slice of a GPU device that the transfer threads need: resource
/// creation, transfer queues and command slots. Implemented by the Vulkan
/// backend and by the test mock.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use crate::error::Result;
use super::buffer::{Buffer, BufferDesc};
use super::semaphore::Semaphore;
use super::texture::{Texture, TextureDesc};

/// Queue family indices of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    /// Family used for rendering
    pub graphics: u32,
    /// Family of the transfer queues
    pub transfer: u32,
}

impl QueueFamilies {
    /// Whether resources must be shared between two families
    pub fn is_shared(&self) -> bool {
        self.graphics != self.transfer
    }
}

/// Region of a buffer-to-buffer copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopyRegion {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

impl BufferCopyRegion {
    /// Copy of the first `size` bytes
    pub fn whole(size: u64) -> Self {
        Self { src_offset: 0, dst_offset: 0, size }
    }
}

/// Region of a buffer-to-texture copy (mip level 0, full extent)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTextureCopyRegion {
    /// Offset of the first texel in the source buffer
    pub buffer_offset: u64,
    pub base_layer: u32,
    pub layer_count: u32,
}

/// Command buffer plus the fence of its last submission
///
/// Recording is `begin`, copy commands, `end`; the slot is then handed to
/// `TransferQueue::submit`. A completed slot must be `reset` before reuse.
pub trait CommandSlot: Send {
    fn begin(&mut self) -> Result<()>;

    fn copy_buffer(
        &mut self,
        src: &Arc<dyn Buffer>,
        dst: &Arc<dyn Buffer>,
        region: BufferCopyRegion,
    ) -> Result<()>;

    /// Copy texel data into a texture
    ///
    /// The texture is transitioned to a transfer destination layout before
    /// the copy and to a shader read-only layout after it.
    fn copy_buffer_to_texture(
        &mut self,
        src: &Arc<dyn Buffer>,
        dst: &Arc<dyn Texture>,
        region: BufferTextureCopyRegion,
    ) -> Result<()>;

    fn end(&mut self) -> Result<()>;

    /// Whether the last submission finished executing
    fn is_complete(&self) -> Result<bool>;

    /// Block until the last submission finishes; `None` waits forever
    ///
    /// Returns `false` on timeout.
    fn wait(&self, timeout: Option<Duration>) -> Result<bool>;

    /// Return the slot to the initial state
    fn reset(&mut self) -> Result<()>;

    /// Downcast support for `TransferQueue::submit`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// One device queue, used by a single transfer thread
pub trait TransferQueue: Send {
    /// Index of the queue inside the transfer family
    fn queue_index(&self) -> u32;

    fn create_command_slot(&self) -> Result<Box<dyn CommandSlot>>;

    /// Submit a recorded slot, signalling `signal` when the GPU is done
    fn submit(&self, slot: &mut dyn CommandSlot, signal: Option<&Arc<dyn Semaphore>>) -> Result<()>;
}

/// GPU device as seen by the transfer machinery
pub trait TransferDevice: Send + Sync {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>>;

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>>;

    /// Number of queues available for transfers
    fn transfer_queue_count(&self) -> u32;

    /// Take ownership of transfer queue `index`
    fn create_transfer_queue(&self, index: u32) -> Result<Box<dyn TransferQueue>>;

    fn queue_families(&self) -> QueueFamilies;
}
