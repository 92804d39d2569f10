//! GPU abstraction used by the transfer machinery
//!
//! Backends (e.g. `starlight_engine_renderer_vulkan`) implement these traits.

pub mod buffer;
pub mod texture;
pub mod semaphore;
pub mod transfer_device;

pub use buffer::*;
pub use texture::*;
pub use semaphore::*;
pub use transfer_device::*;

// Mock transfer device for tests (no GPU required)
#[cfg(test)]
pub(crate) mod mock_transfer_device;
