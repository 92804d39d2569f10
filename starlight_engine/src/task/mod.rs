//! Tasks, workers and the task manager
//!
//! CPU work is packaged in fixed-size `Task`s, executed on background
//! `Worker` threads and acknowledged on the owning thread through
//! `CompleteTask` messages.

mod inline_payload;
mod task;
mod complete_task;
mod worker;
mod frame_scheduler;
mod task_manager;

pub use inline_payload::MAX_PAYLOAD_ALIGN;
pub use task::{Task, TaskBuilder, DEFAULT_TASK_BYTES};
pub use complete_task::{CompleteTask, CompleteTaskBuilder, DEFAULT_COMPLETE_TASK_BYTES};
pub use worker::{TaskWorker, Worker, WorkerConfig};
pub use frame_scheduler::FrameScheduler;
pub use task_manager::{CompleteMessages, TaskManager, TaskManagerConfig};

pub(crate) use worker::{panic_message, send_with_backoff};
