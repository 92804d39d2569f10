/// Transfer requests - what to upload and how to record the copy
///
/// A request is created on the owning thread and consumed by exactly one
/// transfer thread. The thread creates the staging buffer, lets the request
/// fill it, then lets it record the copy into the destination.

use std::sync::Arc;
use bytemuck::Pod;
use crate::device::{
    Buffer, BufferCopyRegion, BufferTextureCopyRegion, BufferUsage, CommandSlot, Semaphore,
    Texture, TextureDesc,
};
use crate::error::{Error, Result};
use super::transfer_slot::{BufferSlot, TextureSlot};

/// Upload into a device-local buffer
pub trait BufferTransferRequest: Send {
    /// Size in bytes of the destination buffer
    fn size(&self) -> u64;

    /// Usage of the destination buffer (`TRANSFER_DST` is added automatically)
    fn usage(&self) -> BufferUsage;

    /// Fill the host-visible staging buffer
    fn write_data(&mut self, staging: &dyn Buffer) -> Result<()>;

    /// Record the staging-to-destination copy
    fn record_copy(
        &self,
        command: &mut dyn CommandSlot,
        staging: &Arc<dyn Buffer>,
        target: &Arc<dyn Buffer>,
    ) -> Result<()> {
        command.copy_buffer(staging, target, BufferCopyRegion::whole(self.size()))
    }
}

/// Upload into a freshly created texture
pub trait TextureTransferRequest: Send {
    fn texture_desc(&self) -> TextureDesc;

    fn write_data(&mut self, staging: &dyn Buffer) -> Result<()>;

    fn record_copy(
        &self,
        command: &mut dyn CommandSlot,
        staging: &Arc<dyn Buffer>,
        target: &Arc<dyn Texture>,
    ) -> Result<()> {
        let region = BufferTextureCopyRegion {
            buffer_offset: 0,
            base_layer: 0,
            layer_count: self.texture_desc().array_layers,
        };
        command.copy_buffer_to_texture(staging, target, region)
    }
}

/// Buffer upload of bytes already in memory
#[derive(Debug, Clone)]
pub struct BufferData {
    data: Vec<u8>,
    usage: BufferUsage,
}

impl BufferData {
    pub fn new(data: Vec<u8>, usage: BufferUsage) -> Self {
        Self { data, usage }
    }

    /// Upload of a slice of plain-old-data elements (vertices, indices, uniforms)
    pub fn from_slice<T: Pod>(elements: &[T], usage: BufferUsage) -> Self {
        Self::new(bytemuck::cast_slice(elements).to_vec(), usage)
    }
}

impl BufferTransferRequest for BufferData {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn write_data(&mut self, staging: &dyn Buffer) -> Result<()> {
        staging.write(0, &self.data)
    }
}

/// Texture upload of tightly packed pixels, layer after layer
#[derive(Debug, Clone)]
pub struct TextureData {
    desc: TextureDesc,
    pixels: Vec<u8>,
}

impl TextureData {
    /// Fails if `pixels` does not match the size described by `desc`
    pub fn new(desc: TextureDesc, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() as u64 != desc.byte_size() {
            return Err(Error::InvalidResource(format!(
                "texture data is {} bytes, {}x{}x{} {:?} needs {}",
                pixels.len(),
                desc.width,
                desc.height,
                desc.array_layers,
                desc.format,
                desc.byte_size()
            )));
        }
        Ok(Self { desc, pixels })
    }
}

impl TextureTransferRequest for TextureData {
    fn texture_desc(&self) -> TextureDesc {
        self.desc.clone()
    }

    fn write_data(&mut self, staging: &dyn Buffer) -> Result<()> {
        staging.write(0, &self.pixels)
    }
}

/// What a transfer thread has to do
pub(crate) enum TransferJob {
    Buffer {
        slot: Arc<BufferSlot>,
        request: Box<dyn BufferTransferRequest>,
    },
    Texture {
        slot: Arc<TextureSlot>,
        request: Box<dyn TextureTransferRequest>,
    },
}

/// Request handed from the owning thread to a transfer thread
///
/// Receiving it from the channel is the claim: each request reaches exactly one thread.
pub(crate) struct InterThreadRequest {
    pub(crate) job: TransferJob,
    pub(crate) signal: Option<Arc<dyn Semaphore>>,
}

impl InterThreadRequest {
    /// Record a failure on the destination slot
    pub(crate) fn fail(&self, error: Error) {
        match &self.job {
            TransferJob::Buffer { slot, .. } => slot.fail(error),
            TransferJob::Texture { slot, .. } => slot.fail(error),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match &self.job {
            TransferJob::Buffer { .. } => "buffer",
            TransferJob::Texture { .. } => "texture",
        }
    }
}

#[cfg(test)]
#[path = "transfer_request_tests.rs"]
mod tests;
