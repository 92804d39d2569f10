/// Buffer controllers - CPU-side owners of GPU buffer contents
///
/// A controller decides when each frame-in-flight copy of its buffer is stale
/// and produces the transfer request that refreshes it.

use std::any::Any;
use crate::device::BufferUsage;
use crate::transfer::{BufferData, BufferTransferRequest};

/// Source of a GPU buffer managed by `RenderResourceManager`
pub trait BufferController: Send {
    /// Number of buffer copies (1 = one buffer shared by every frame)
    fn frames_in_flight(&self) -> usize;

    /// Whether copy `frame_in_flight` must be uploaded again
    fn needs_update(&self, frame_in_flight: usize) -> bool;

    /// Request refreshing copy `frame_in_flight`
    ///
    /// Called once per issued upload; the copy is considered up to date afterwards.
    fn create_transfer_request(&mut self, frame_in_flight: usize) -> Box<dyn BufferTransferRequest>;

    /// Flag copy `frame_in_flight` stale again after its upload could not be issued
    fn mark_dirty(&mut self, frame_in_flight: usize);

    /// Route uploads through the high-priority transfer channel
    fn is_high_priority(&self) -> bool {
        false
    }

    /// Downcast support for `RenderResourceManager::controller_mut`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Per-frame-in-flight dirty flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyFrames {
    dirty: Vec<bool>,
}

impl DirtyFrames {
    /// Every frame starts dirty
    pub fn new(frames_in_flight: usize) -> Self {
        Self { dirty: vec![true; frames_in_flight.max(1)] }
    }

    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    pub fn is_dirty(&self, frame_in_flight: usize) -> bool {
        self.dirty.get(frame_in_flight).copied().unwrap_or(false)
    }

    pub fn mark(&mut self, frame_in_flight: usize) {
        if let Some(dirty) = self.dirty.get_mut(frame_in_flight) {
            *dirty = true;
        }
    }

    pub fn mark_all(&mut self) {
        self.dirty.iter_mut().for_each(|dirty| *dirty = true);
    }

    pub fn clear(&mut self, frame_in_flight: usize) {
        if let Some(dirty) = self.dirty.get_mut(frame_in_flight) {
            *dirty = false;
        }
    }

    /// Whether any frame still needs an upload
    pub fn any(&self) -> bool {
        self.dirty.iter().any(|dirty| *dirty)
    }
}

/// Controller for a buffer whose bytes are set from the CPU
///
/// Every `set_data` marks all copies stale; each copy is then uploaded once.
#[derive(Debug, Clone)]
pub struct DataBufferController {
    data: Vec<u8>,
    usage: BufferUsage,
    dirty: DirtyFrames,
    high_priority: bool,
}

impl DataBufferController {
    pub fn new(data: Vec<u8>, usage: BufferUsage, frames_in_flight: usize) -> Self {
        Self {
            data,
            usage,
            dirty: DirtyFrames::new(frames_in_flight),
            high_priority: false,
        }
    }

    /// Controller of a buffer shared by every frame (geometry, static data)
    pub fn shared(data: Vec<u8>, usage: BufferUsage) -> Self {
        Self::new(data, usage, 1)
    }

    pub fn with_high_priority(mut self, high_priority: bool) -> Self {
        self.high_priority = high_priority;
        self
    }

    /// Replace the contents and schedule an upload of every copy
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.dirty.mark_all();
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl BufferController for DataBufferController {
    fn frames_in_flight(&self) -> usize {
        self.dirty.len()
    }

    fn needs_update(&self, frame_in_flight: usize) -> bool {
        self.dirty.is_dirty(frame_in_flight)
    }

    fn create_transfer_request(&mut self, frame_in_flight: usize) -> Box<dyn BufferTransferRequest> {
        self.dirty.clear(frame_in_flight);
        Box::new(BufferData::new(self.data.clone(), self.usage))
    }

    fn mark_dirty(&mut self, frame_in_flight: usize) {
        self.dirty.mark(frame_in_flight);
    }

    fn is_high_priority(&self) -> bool {
        self.high_priority
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
#[path = "buffer_controller_tests.rs"]
mod tests;
