/// FrameScheduler - tasks deferred until a given frame index

use std::collections::BTreeMap;
use super::task::Task;

/// Frame-indexed task buckets
///
/// Owner-thread only. Tasks scheduled for a frame stay here until that frame
/// is fetched; buckets for frames that are never fetched live until `clear`
/// or drop.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    frames: BTreeMap<u64, Vec<Task>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer `task` until `frame_index`
    pub fn schedule(&mut self, frame_index: u64, task: Task) {
        self.frames.entry(frame_index).or_default().push(task);
    }

    /// Remove and return every task scheduled for `frame_index`, in scheduling order
    pub fn fetch_tasks_for_frame(&mut self, frame_index: u64) -> Vec<Task> {
        self.frames.remove(&frame_index).unwrap_or_default()
    }

    /// Number of tasks scheduled for `frame_index`
    pub fn tasks_for_frame(&self, frame_index: u64) -> usize {
        self.frames.get(&frame_index).map_or(0, Vec::len)
    }

    /// Earliest frame with pending tasks
    pub fn next_frame(&self) -> Option<u64> {
        self.frames.keys().next().copied()
    }

    /// Total number of pending tasks
    pub fn len(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drop every pending task
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
#[path = "frame_scheduler_tests.rs"]
mod tests;
