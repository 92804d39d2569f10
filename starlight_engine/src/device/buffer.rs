/// Buffer trait and buffer descriptor

use std::any::Any;
use bitflags::bitflags;
use crate::error::Result;

bitflags! {
    /// Buffer usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Source of a copy command (staging buffers)
        const TRANSFER_SRC = 1 << 0;
        /// Destination of a copy command
        const TRANSFER_DST = 1 << 1;
        const VERTEX       = 1 << 2;
        const INDEX        = 1 << 3;
        const UNIFORM      = 1 << 4;
        const STORAGE      = 1 << 5;
    }
}

/// Where the buffer memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Host visible, written by the CPU and read by the GPU (staging)
    CpuToGpu,
    /// Device local, not CPU accessible
    GpuOnly,
    /// Host visible, written by the GPU and read back by the CPU
    GpuToCpu,
}

impl MemoryLocation {
    /// Whether `Buffer::write` / `Buffer::read` are allowed
    pub fn is_host_visible(&self) -> bool {
        !matches!(self, MemoryLocation::GpuOnly)
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Memory location
    pub location: MemoryLocation,
}

impl BufferDesc {
    /// Host-visible source buffer for an upload
    pub fn staging(size: u64) -> Self {
        Self {
            size,
            usage: BufferUsage::TRANSFER_SRC,
            location: MemoryLocation::CpuToGpu,
        }
    }

    /// Device-local destination buffer for an upload
    pub fn device_local(size: u64, usage: BufferUsage) -> Self {
        Self {
            size,
            usage: usage | BufferUsage::TRANSFER_DST,
            location: MemoryLocation::GpuOnly,
        }
    }

    /// Host-visible destination buffer for a readback
    pub fn readback(size: u64) -> Self {
        Self {
            size,
            usage: BufferUsage::TRANSFER_DST,
            location: MemoryLocation::GpuToCpu,
        }
    }
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., VulkanBuffer).
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    fn usage(&self) -> BufferUsage;

    fn location(&self) -> MemoryLocation;

    /// Write `data` at `offset` through the buffer's mapped memory
    ///
    /// Fails for buffers that are not host visible or when the range overflows the buffer.
    fn write(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Read `out.len()` bytes at `offset` from the buffer's mapped memory
    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()>;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
