/// RenderResourceManager - GPU buffers driven by controllers
///
/// Each registered controller owns one transfer slot per frame-in-flight copy.
/// `update` is called once per frame by the owning thread and issues uploads
/// for the copies the controllers report as stale. Every upload signals a
/// semaphore of its own, so a renderer waits on each signal exactly once.

use std::sync::Arc;
use std::time::Duration;
use crate::device::{Buffer, Semaphore};
use crate::error::Result;
use crate::handle::{Cleanup, Handle, HandleType, ManagedHandleContainer, MappedHandleContainer};
use crate::transfer::{BufferSlot, TransferWorker};
use crate::{engine_debug, engine_warn};
use super::buffer_controller::BufferController;

/// Upper bound on how long removal waits for a pending upload
const REMOVE_WAIT: Duration = Duration::from_secs(1);

/// Controller plus the per-frame destinations it feeds
pub struct BufferRecord {
    controller: Box<dyn BufferController>,
    slots: Vec<Arc<BufferSlot>>,
    // Signal semaphore of the last upload issued per copy
    semaphores: Vec<Option<Arc<dyn Semaphore>>>,
}

impl BufferRecord {
    fn copy_index(&self, frame_in_flight: usize) -> usize {
        frame_in_flight % self.slots.len()
    }

    pub fn controller(&self) -> &dyn BufferController {
        self.controller.as_ref()
    }

    pub fn slot(&self, frame_in_flight: usize) -> &Arc<BufferSlot> {
        &self.slots[self.copy_index(frame_in_flight)]
    }

    pub fn semaphore(&self, frame_in_flight: usize) -> Option<&Arc<dyn Semaphore>> {
        self.semaphores[self.copy_index(frame_in_flight)].as_ref()
    }
}

impl Cleanup for BufferRecord {
    type Device = ();

    fn cleanup(&mut self, _device: &()) {
        for slot in &self.slots {
            if !slot.wait(Some(REMOVE_WAIT)) {
                engine_warn!("starlight::RenderResourceManager", "Removing buffer with an upload still in progress");
            }
        }
        self.slots.clear();
        self.semaphores.clear();
    }
}

pub struct RenderResourceManager {
    buffers: ManagedHandleContainer<BufferRecord, MappedHandleContainer<BufferRecord>>,
}

impl RenderResourceManager {
    pub fn new() -> Self {
        Self {
            buffers: ManagedHandleContainer::new(MappedHandleContainer::new(HandleType::Buffer)),
        }
    }

    /// Register a controller; returns a `Buffer` handle
    ///
    /// One slot is created per copy reported by the controller.
    pub fn add_buffer(&mut self, controller: Box<dyn BufferController>) -> Result<Handle> {
        let copies = controller.frames_in_flight().max(1);
        let slots = (0..copies).map(|_| Arc::new(BufferSlot::new())).collect();
        let semaphores = vec![None; copies];

        let handle = self.buffers.insert(BufferRecord { controller, slots, semaphores })?;
        engine_debug!("starlight::RenderResourceManager", "Added buffer {} ({} copies)", handle, copies);
        Ok(handle)
    }

    /// Issue uploads for every stale copy used by `frame_in_flight`
    ///
    /// Copies with an upload still in progress are skipped and retried on a
    /// later update. Each upload gets a new signal semaphore from the transfer
    /// device. A copy whose upload could not be issued stays stale. Returns
    /// the number of uploads issued.
    pub fn update(&mut self, frame_in_flight: usize, transfer: &TransferWorker) -> Result<usize> {
        let mut issued = 0;

        for (handle, record) in self.buffers.storage_mut().iter_mut() {
            let copy = record.copy_index(frame_in_flight);
            let slot = &record.slots[copy];
            if slot.is_in_progress() || !record.controller.needs_update(copy) {
                continue;
            }

            let high_priority = record.controller.is_high_priority();
            let request = record.controller.create_transfer_request(copy);
            let upload = transfer.device().create_semaphore().and_then(|semaphore| {
                transfer.add_buffer(slot, Some(semaphore.clone()), request, high_priority)?;
                Ok(semaphore)
            });

            match upload {
                Ok(semaphore) => {
                    record.semaphores[copy] = Some(semaphore);
                    issued += 1;
                }
                Err(error) => {
                    record.controller.mark_dirty(copy);
                    engine_warn!(
                        "starlight::RenderResourceManager",
                        "Upload of buffer {} copy {} not issued: {}",
                        handle,
                        copy,
                        error
                    );
                    return Err(error);
                }
            }
        }

        Ok(issued)
    }

    /// Whether the copy used by `frame_in_flight` holds uploaded data
    pub fn is_ready(&self, handle: Handle, frame_in_flight: usize) -> bool {
        self.buffers
            .try_get(handle)
            .map_or(false, |record| record.slot(frame_in_flight).is_ready())
    }

    /// GPU buffer of the copy used by `frame_in_flight`, once uploaded
    pub fn buffer(&self, handle: Handle, frame_in_flight: usize) -> Option<Arc<dyn Buffer>> {
        self.buffers.try_get(handle)?.slot(frame_in_flight).resource()
    }

    /// Semaphore signalled by the last upload of the copy used by `frame_in_flight`
    ///
    /// `None` until a first upload was issued. A new semaphore replaces it on
    /// every upload.
    pub fn semaphore(&self, handle: Handle, frame_in_flight: usize) -> Option<Arc<dyn Semaphore>> {
        self.buffers.try_get(handle)?.semaphore(frame_in_flight).cloned()
    }

    pub fn record(&self, handle: Handle) -> Option<&BufferRecord> {
        self.buffers.try_get(handle)
    }

    /// Concrete controller of `handle`, e.g. to change its data
    ///
    /// Returns `None` for unknown handles or when the controller is not a `C`.
    pub fn controller_mut<C: BufferController + 'static>(&mut self, handle: Handle) -> Option<&mut C> {
        self.buffers
            .try_get_mut(handle)?
            .controller
            .as_any_mut()
            .downcast_mut::<C>()
    }

    /// Remove a buffer, waiting briefly for a pending upload
    pub fn remove(&mut self, handle: Handle) -> bool {
        self.buffers.remove(handle, &())
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl Default for RenderResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RenderResourceManager {
    fn drop(&mut self) {
        self.buffers.cleanup_all(&());
    }
}

#[cfg(test)]
#[path = "render_resource_manager_tests.rs"]
mod tests;
