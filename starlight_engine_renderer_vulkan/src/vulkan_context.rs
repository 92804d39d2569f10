/// GpuContext - Shared GPU state for every Vulkan transfer object
///
/// Buffers, textures, semaphores and command slots all keep an `Arc` to the
/// context, so the allocator outlives every allocation made from it.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, Allocator};
use starlight_engine::engine_err;
use starlight_engine::starlight::device::QueueFamilies;
use starlight_engine::starlight::Result;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

/// Shared GPU context for all Vulkan transfer resources.
///
/// The logical device itself is created and destroyed by the application;
/// the context only borrows it. Every resource built from the context must be
/// dropped before the device is destroyed.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop to release its memory blocks explicitly
    allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics and transfer queue family indices
    pub queue_families: QueueFamilies,
}

impl GpuContext {
    pub fn new(device: ash::Device, allocator: Allocator, queue_families: QueueFamilies) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            queue_families,
        }
    }

    /// Lock the allocator, reporting a poisoned lock as a backend error
    pub fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| engine_err!("starlight::vulkan", "GPU allocator lock is poisoned"))
    }

    /// Return an allocation to the allocator
    ///
    /// Used from `Drop` implementations, so failures are only logged.
    pub(crate) fn free(&self, allocation: Allocation) {
        match self.allocator.lock() {
            Ok(mut allocator) => {
                if let Err(e) = allocator.free(allocation) {
                    starlight_engine::engine_warn!("starlight::vulkan", "Failed to free GPU allocation: {:?}", e);
                }
            }
            Err(_) => {
                starlight_engine::engine_warn!("starlight::vulkan", "GPU allocator lock is poisoned, leaking allocation");
            }
        }
    }

    /// Sharing mode and family list for resources used by both families
    ///
    /// Resources are created `CONCURRENT` when the graphics and transfer
    /// families differ, so no ownership transfer barrier is needed.
    pub fn sharing(&self) -> (vk::SharingMode, Vec<u32>) {
        if self.queue_families.is_shared() {
            (
                vk::SharingMode::CONCURRENT,
                vec![self.queue_families.graphics, self.queue_families.transfer],
            )
        } else {
            (vk::SharingMode::EXCLUSIVE, Vec::new())
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        // NOTE: The device is owned by the application and is not destroyed here.
        unsafe {
            ManuallyDrop::drop(&mut self.allocator);
        }
    }
}
