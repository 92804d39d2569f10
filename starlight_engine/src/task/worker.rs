/// Worker - one background thread draining a bounded task queue
///
/// Tasks are pushed by the owning thread and executed in FIFO order on the
/// worker thread. Completion messages produced by tasks are forwarded to the
/// task manager's completion channel.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use crossbeam_utils::Backoff;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_error, engine_warn};
use super::complete_task::CompleteTask;
use super::task::Task;

/// Worker thread configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Maximum number of queued tasks before `queue_task` blocks
    pub queue_capacity: usize,

    /// Sleep between polls when the queue is empty
    pub idle_sleep: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            idle_sleep: Duration::from_millis(1),
        }
    }
}

/// Type-erased worker interface
///
/// The task manager only talks to workers through this trait, so custom
/// worker kinds (thread pools, job systems) can be registered next to `Worker`.
pub trait TaskWorker: Send {
    /// Worker (and thread) name
    fn name(&self) -> &str;

    /// Enqueue a task, blocking while the queue is full
    fn queue_task(&self, task: Task);

    /// Enqueue without blocking; gives the task back when the queue is full
    fn try_queue_task(&self, task: Task) -> std::result::Result<(), Task>;

    /// Spawn the worker thread (no-op if already running)
    fn start(&mut self) -> Result<()>;

    /// Stop the worker thread and wait for the running task to finish
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Single-thread worker with a bounded FIFO queue
pub struct Worker {
    name: String,
    idle_sleep: Duration,
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    completions: Sender<CompleteTask>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Create a stopped worker
    ///
    /// `completions` receives the completion messages of finished tasks.
    pub fn new(name: impl Into<String>, config: WorkerConfig, completions: Sender<CompleteTask>) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(config.queue_capacity.max(1));
        Self {
            name: name.into(),
            idle_sleep: config.idle_sleep,
            sender,
            receiver,
            completions,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Number of tasks waiting in the queue
    pub fn pending_tasks(&self) -> usize {
        self.receiver.len()
    }
}

impl TaskWorker for Worker {
    fn name(&self) -> &str {
        &self.name
    }

    fn queue_task(&self, task: Task) {
        // The worker owns a receiver, so the channel never disconnects
        let _ = send_with_backoff(&self.sender, task);
    }

    fn try_queue_task(&self, task: Task) -> std::result::Result<(), Task> {
        match self.sender.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(task)) | Err(TrySendError::Disconnected(task)) => Err(task),
        }
    }

    fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }

        self.running.store(true, Ordering::Release);
        let context = WorkerLoop {
            name: self.name.clone(),
            idle_sleep: self.idle_sleep,
            receiver: self.receiver.clone(),
            completions: self.completions.clone(),
            running: self.running.clone(),
        };

        let thread = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || context.run())
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                Error::InitializationFailed(format!("Failed to spawn worker thread '{}': {}", self.name, e))
            })?;

        self.thread = Some(thread);
        engine_debug!("starlight::Worker", "Worker '{}' started", self.name);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                engine_error!("starlight::Worker", "Worker '{}' thread terminated abnormally", self.name);
            }
            engine_debug!(
                "starlight::Worker",
                "Worker '{}' stopped ({} tasks left in queue)",
                self.name,
                self.receiver.len()
            );
        }
    }

    fn is_running(&self) -> bool {
        self.thread.is_some() && self.running.load(Ordering::Acquire)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved onto the worker thread
struct WorkerLoop {
    name: String,
    idle_sleep: Duration,
    receiver: Receiver<Task>,
    completions: Sender<CompleteTask>,
    running: Arc<AtomicBool>,
}

impl WorkerLoop {
    fn run(self) {
        while self.running.load(Ordering::Acquire) {
            match self.receiver.try_recv() {
                Ok(task) => self.execute(task),
                Err(TryRecvError::Empty) => thread::sleep(self.idle_sleep),
                Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn execute(&self, mut task: Task) {
        let result = panic::catch_unwind(AssertUnwindSafe(move || {
            task.run();
            task.complete_message()
        }));

        match result {
            Ok(Some(message)) => self.push_complete(message),
            Ok(None) => {}
            Err(payload) => {
                engine_error!(
                    "starlight::Worker",
                    "Task panicked on worker '{}': {}",
                    self.name,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    fn push_complete(&self, message: CompleteTask) {
        let backoff = Backoff::new();
        let mut message = message;
        loop {
            match self.completions.try_send(message) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if !self.running.load(Ordering::Acquire) {
                        engine_warn!(
                            "starlight::Worker",
                            "Completion channel full while worker '{}' stops, dropping message",
                            self.name
                        );
                        return;
                    }
                    message = rejected;
                    backoff.snooze();
                }
                Err(TrySendError::Disconnected(_)) => {
                    engine_warn!(
                        "starlight::Worker",
                        "Completion channel closed, dropping message from worker '{}'",
                        self.name
                    );
                    return;
                }
            }
        }
    }
}

/// Push on a bounded channel, spin-yielding while it is full
///
/// Returns the item back if every receiver is gone.
pub(crate) fn send_with_backoff<T>(sender: &Sender<T>, item: T) -> std::result::Result<(), T> {
    let backoff = Backoff::new();
    let mut item = item;
    loop {
        match sender.try_send(item) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(rejected)) => {
                item = rejected;
                backoff.snooze();
            }
            Err(TrySendError::Disconnected(rejected)) => return Err(rejected),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
