/// TransferWorker - front end of the transfer threads
///
/// One `TransferManagerThread` is spawned per transfer queue of the device.
/// Requests are routed through two bounded channels:
/// - one queue: its thread serves the high-priority channel, then the standard one
/// - several queues: thread 0 serves high priority first (then standard), the
///   other threads serve standard requests only

use std::sync::Arc;
use std::time::Duration;
use crossbeam_channel::{Receiver, Sender};
use crate::device::{Semaphore, TransferDevice};
use crate::error::{Error, Result};
use crate::task::send_with_backoff;
use crate::{engine_info, engine_warn};
use super::transfer_manager_thread::{RequestIntake, ThreadSettings, TransferManagerThread};
use super::transfer_request::{
    BufferTransferRequest, InterThreadRequest, TextureTransferRequest, TransferJob,
};
use super::transfer_slot::{BufferSlot, TextureSlot};

/// Transfer threads configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    /// Capacity of each request channel before `add_*` blocks
    pub request_capacity: usize,

    /// Sleep between polls when no request is queued
    pub idle_sleep: Duration,

    /// Command slots per thread before the thread waits on the oldest submission
    pub max_command_slots: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            request_capacity: 128,
            idle_sleep: Duration::from_millis(2),
            max_command_slots: 8,
        }
    }
}

pub struct TransferWorker {
    device: Arc<dyn TransferDevice>,
    high_priority: Sender<InterThreadRequest>,
    standard: Sender<InterThreadRequest>,
    // Kept so queued requests can be failed after the threads stopped
    receivers: [Receiver<InterThreadRequest>; 2],
    threads: Vec<TransferManagerThread>,
}

impl TransferWorker {
    /// Spawn one transfer thread per transfer queue of `device`
    pub fn new(device: Arc<dyn TransferDevice>, config: TransferConfig) -> Result<Self> {
        let queue_count = device.transfer_queue_count();
        if queue_count == 0 {
            return Err(Error::InitializationFailed("device exposes no transfer queue".to_string()));
        }

        let capacity = config.request_capacity.max(1);
        let (high_priority, high_receiver) = crossbeam_channel::bounded(capacity);
        let (standard, standard_receiver) = crossbeam_channel::bounded(capacity);
        let settings = ThreadSettings {
            idle_sleep: config.idle_sleep,
            max_command_slots: config.max_command_slots,
        };

        let mut threads = Vec::with_capacity(queue_count as usize);
        for index in 0..queue_count {
            let intake = RequestIntake {
                high: if index == 0 { Some(high_receiver.clone()) } else { None },
                standard: Some(standard_receiver.clone()),
            };
            let queue = device.create_transfer_queue(index)?;
            threads.push(TransferManagerThread::spawn(
                format!("starlight-transfer-{}", index),
                device.clone(),
                queue,
                intake,
                settings,
            )?);
        }

        engine_info!("starlight::TransferWorker", "Started {} transfer threads", threads.len());

        Ok(Self {
            device,
            high_priority,
            standard,
            receivers: [high_receiver, standard_receiver],
            threads,
        })
    }

    /// Queue an upload into `slot`
    ///
    /// The slot is marked in progress immediately. `semaphore` is signalled
    /// when the copy finished on the GPU. Blocks while the chosen channel is full.
    pub fn add_buffer(
        &self,
        slot: &Arc<BufferSlot>,
        semaphore: Option<Arc<dyn Semaphore>>,
        request: Box<dyn BufferTransferRequest>,
        high_priority: bool,
    ) -> Result<()> {
        slot.begin();
        self.push(
            InterThreadRequest {
                job: TransferJob::Buffer { slot: slot.clone(), request },
                signal: semaphore,
            },
            high_priority,
        )
    }

    /// Queue a texture upload into `slot`; a new texture is created for every request
    pub fn add_texture(
        &self,
        slot: &Arc<TextureSlot>,
        semaphore: Option<Arc<dyn Semaphore>>,
        request: Box<dyn TextureTransferRequest>,
        high_priority: bool,
    ) -> Result<()> {
        slot.begin();
        self.push(
            InterThreadRequest {
                job: TransferJob::Texture { slot: slot.clone(), request },
                signal: semaphore,
            },
            high_priority,
        )
    }

    /// Requests queued and not yet claimed by a thread
    pub fn pending_requests(&self) -> usize {
        self.high_priority.len() + self.standard.len()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Names of the transfer threads, thread 0 first
    pub fn thread_names(&self) -> Vec<&str> {
        self.threads.iter().map(TransferManagerThread::name).collect()
    }

    pub fn is_running(&self) -> bool {
        self.threads.iter().any(TransferManagerThread::is_running)
    }

    pub fn device(&self) -> &Arc<dyn TransferDevice> {
        &self.device
    }

    /// Stop every thread after its current request and wait for in-flight submissions
    ///
    /// Requests still queued are failed with `Error::WorkerStopped`.
    pub fn stop(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        for thread in &self.threads {
            thread.request_stop();
        }
        for thread in &mut self.threads {
            thread.join();
        }
        self.threads.clear();
        self.fail_queued();
        engine_info!("starlight::TransferWorker", "Transfer threads stopped");
    }

    fn push(&self, request: InterThreadRequest, high_priority: bool) -> Result<()> {
        if self.threads.is_empty() {
            let error = Error::WorkerStopped("transfer worker stopped".to_string());
            request.fail(error.clone());
            return Err(error);
        }

        let sender = if high_priority { &self.high_priority } else { &self.standard };
        match send_with_backoff(sender, request) {
            Ok(()) => Ok(()),
            Err(request) => {
                let error = Error::WorkerStopped("transfer channel closed".to_string());
                request.fail(error.clone());
                Err(error)
            }
        }
    }

    fn fail_queued(&self) {
        for receiver in &self.receivers {
            while let Ok(request) = receiver.try_recv() {
                engine_warn!("starlight::TransferWorker", "Dropping queued {} request", request.kind());
                request.fail(Error::WorkerStopped("transfer worker stopped".to_string()));
            }
        }
    }
}

impl Drop for TransferWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "transfer_worker_tests.rs"]
mod tests;
