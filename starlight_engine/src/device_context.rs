/// DeviceContext - owning-thread frame driver
///
/// Ties the task manager, the transfer worker and the render resources
/// together. The owning thread calls `prepare_for_next_frame` once per frame;
/// everything the background threads produced is consumed there.

use std::sync::Arc;
use crate::device::TransferDevice;
use crate::error::Result;
use crate::engine_info;
use crate::handle::Handle;
use crate::render::{BufferController, RenderResourceManager};
use crate::task::{TaskManager, TaskManagerConfig};
use crate::transfer::{TransferConfig, TransferWorker};

/// Device context configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceContextConfig {
    /// Number of frames the CPU may record ahead of the GPU
    pub frames_in_flight: usize,
    pub task_manager: TaskManagerConfig,
    pub transfer: TransferConfig,
}

impl Default for DeviceContextConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            task_manager: TaskManagerConfig::default(),
            transfer: TransferConfig::default(),
        }
    }
}

/// What happened during one `prepare_for_next_frame`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub frame_in_flight: usize,
    /// Scheduled tasks handed to workers
    pub dispatched_tasks: usize,
    /// Buffer uploads issued by render resources
    pub issued_uploads: usize,
    /// Completion messages run on the owning thread
    pub completed_messages: usize,
}

pub struct DeviceContext {
    // Field order is drop order: workers stop first, resources wait for
    // their uploads while the transfer threads still run
    task_manager: TaskManager,
    render_resources: RenderResourceManager,
    transfer_worker: TransferWorker,
    device: Arc<dyn TransferDevice>,
    frame_index: u64,
    frames_in_flight: usize,
}

impl DeviceContext {
    /// Start the workers and one transfer thread per transfer queue of `device`
    pub fn new(device: Arc<dyn TransferDevice>, config: DeviceContextConfig) -> Result<Self> {
        let mut task_manager = TaskManager::new(config.task_manager);
        task_manager.start_all()?;
        let transfer_worker = TransferWorker::new(device.clone(), config.transfer)?;

        engine_info!(
            "starlight::DeviceContext",
            "Device context ready ({} frames in flight, {} transfer threads)",
            config.frames_in_flight.max(1),
            transfer_worker.thread_count()
        );

        Ok(Self {
            task_manager,
            render_resources: RenderResourceManager::new(),
            transfer_worker,
            device,
            frame_index: 0,
            frames_in_flight: config.frames_in_flight.max(1),
        })
    }

    /// Advance to the next frame
    ///
    /// Runs the completion messages of finished tasks, dispatches the tasks
    /// scheduled for the new frame index, issues the uploads of stale render
    /// resources for the new frame-in-flight, then runs the completions that
    /// arrived meanwhile.
    pub fn prepare_for_next_frame(&mut self) -> Result<FrameReport> {
        self.frame_index += 1;
        let frame_in_flight = self.frame_in_flight();

        let mut completed_messages = self.task_manager.run_completions();
        let dispatched_tasks = self.task_manager.dispatch_tasks_for_frame(self.frame_index);
        let issued_uploads = self.render_resources.update(frame_in_flight, &self.transfer_worker)?;
        completed_messages += self.task_manager.run_completions();

        Ok(FrameReport {
            frame_index: self.frame_index,
            frame_in_flight,
            dispatched_tasks,
            issued_uploads,
            completed_messages,
        })
    }

    /// Register a buffer controller with the render resources
    pub fn add_buffer(&mut self, controller: Box<dyn BufferController>) -> Result<Handle> {
        self.render_resources.add_buffer(controller)
    }

    /// Index of the last prepared frame (0 before the first frame)
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Frame-in-flight slot of the current frame
    pub fn frame_in_flight(&self) -> usize {
        (self.frame_index % self.frames_in_flight as u64) as usize
    }

    pub fn task_manager(&self) -> &TaskManager {
        &self.task_manager
    }

    pub fn task_manager_mut(&mut self) -> &mut TaskManager {
        &mut self.task_manager
    }

    pub fn transfer_worker(&self) -> &TransferWorker {
        &self.transfer_worker
    }

    pub fn render_resources(&self) -> &RenderResourceManager {
        &self.render_resources
    }

    pub fn render_resources_mut(&mut self) -> &mut RenderResourceManager {
        &mut self.render_resources
    }

    pub fn device(&self) -> &Arc<dyn TransferDevice> {
        &self.device
    }
}

#[cfg(test)]
#[path = "device_context_tests.rs"]
mod tests;
