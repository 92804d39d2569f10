/// Task - type-erased unit of CPU work with inline payload storage
///
/// A task stores its payload and the typed functions that operate on it
/// inside a fixed-size buffer, so tasks of unrelated payload types can share
/// bounded queues without a heap allocation per task.

use crate::error::{Error, Result};
use super::complete_task::CompleteTask;
use super::inline_payload::InlinePayload;

/// Default inline storage size of a `Task`, in bytes
pub const DEFAULT_TASK_BYTES: usize = 256;

/// Payload plus its typed functions, as stored inline
struct TaskSlot<P> {
    payload: P,
    execute: fn(&mut P),
    destroy: Option<fn(&mut P)>,
    complete: Option<fn(&mut P) -> CompleteTask>,
}

impl<P> Drop for TaskSlot<P> {
    fn drop(&mut self) {
        if let Some(destroy) = self.destroy {
            destroy(&mut self.payload);
        }
    }
}

unsafe fn run_slot<P>(ptr: *mut u8) {
    // SAFETY: registered together with a TaskSlot<P> written at `ptr`
    let slot = unsafe { &mut *ptr.cast::<TaskSlot<P>>() };
    (slot.execute)(&mut slot.payload);
}

unsafe fn complete_slot<P>(ptr: *mut u8) -> Option<CompleteTask> {
    // SAFETY: registered together with a TaskSlot<P> written at `ptr`
    let slot = unsafe { &mut *ptr.cast::<TaskSlot<P>>() };
    slot.complete.map(|complete| complete(&mut slot.payload))
}

/// Type-erased task with `N` bytes of inline payload storage
///
/// A default task is inert: running it does nothing. A built task owns its
/// payload until dropped; `run` may be called any number of times.
pub struct Task<const N: usize = DEFAULT_TASK_BYTES> {
    payload: InlinePayload<N>,
    run_fn: Option<unsafe fn(*mut u8)>,
    complete_fn: Option<unsafe fn(*mut u8) -> Option<CompleteTask>>,
}

impl<const N: usize> Task<N> {
    /// Start building a task around a payload of type `P`
    pub fn builder<P: Send + 'static>() -> TaskBuilder<P, N> {
        TaskBuilder::new()
    }

    /// Build a task from a closure
    ///
    /// The closure itself is the payload, so its captures count toward `N`.
    pub fn from_fn<F: FnMut() + Send + 'static>(f: F) -> Result<Self> {
        TaskBuilder::<F, N>::new()
            .payload(f)
            .execute(|f: &mut F| f())
            .build()
    }

    /// Whether the task holds a payload
    pub fn is_armed(&self) -> bool {
        self.payload.is_armed()
    }

    /// Execute the task's function on its payload
    pub fn run(&mut self) {
        if let Some(run_fn) = self.run_fn {
            let ptr = self.payload.as_mut_ptr();
            // SAFETY: run_fn was monomorphized for the slot stored in `payload`
            unsafe { run_fn(ptr) };
        }
    }

    /// Whether the task produces a completion message for the owning thread
    pub fn has_complete_message(&self) -> bool {
        self.complete_fn.is_some()
    }

    /// Create the completion message for the owning thread, if the task has one
    pub fn complete_message(&mut self) -> Option<CompleteTask> {
        let complete_fn = self.complete_fn?;
        let ptr = self.payload.as_mut_ptr();
        // SAFETY: complete_fn was monomorphized for the slot stored in `payload`
        unsafe { complete_fn(ptr) }
    }
}

impl<const N: usize> Default for Task<N> {
    fn default() -> Self {
        Self {
            payload: InlinePayload::empty(),
            run_fn: None,
            complete_fn: None,
        }
    }
}

impl<const N: usize> std::fmt::Debug for Task<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("capacity", &N)
            .field("armed", &self.is_armed())
            .field("has_complete_message", &self.has_complete_message())
            .finish()
    }
}

/// Builder for `Task`
///
/// `payload` and `execute` are required. Size and alignment of the payload are
/// validated by `build`.
///
/// # Example
///
/// ```
/// use starlight_engine::starlight::task::Task;
///
/// struct Compile { shader: String }
///
/// let mut task: Task = Task::builder::<Compile>()
///     .payload(Compile { shader: "mesh.vert".to_string() })
///     .execute(|compile| println!("compiling {}", compile.shader))
///     .build()
///     .unwrap();
/// task.run();
/// ```
pub struct TaskBuilder<P, const N: usize = DEFAULT_TASK_BYTES> {
    payload: Option<P>,
    execute: Option<fn(&mut P)>,
    destroy: Option<fn(&mut P)>,
    complete: Option<fn(&mut P) -> CompleteTask>,
}

impl<P: Send + 'static, const N: usize> TaskBuilder<P, N> {
    pub fn new() -> Self {
        Self {
            payload: None,
            execute: None,
            destroy: None,
            complete: None,
        }
    }

    /// Payload moved into the task's inline storage
    pub fn payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Function run by `Task::run`
    pub fn execute(mut self, execute: fn(&mut P)) -> Self {
        self.execute = Some(execute);
        self
    }

    /// Hook run right before the payload is dropped
    pub fn destroy(mut self, destroy: fn(&mut P)) -> Self {
        self.destroy = Some(destroy);
        self
    }

    /// Factory for the message handed back to the owning thread after `run`
    pub fn complete_with(mut self, complete: fn(&mut P) -> CompleteTask) -> Self {
        self.complete = Some(complete);
        self
    }

    pub fn build(self) -> Result<Task<N>> {
        InlinePayload::<N>::check_fits::<TaskSlot<P>>()?;
        let payload = self.payload
            .ok_or_else(|| Error::InvalidTask("task built without a payload".to_string()))?;
        let execute = self.execute
            .ok_or_else(|| Error::InvalidTask("task built without an execute function".to_string()))?;

        let has_complete = self.complete.is_some();
        let slot = TaskSlot {
            payload,
            execute,
            destroy: self.destroy,
            complete: self.complete,
        };

        Ok(Task {
            payload: InlinePayload::new(slot)?,
            run_fn: Some(run_slot::<P>),
            complete_fn: if has_complete { Some(complete_slot::<P>) } else { None },
        })
    }
}

impl<P: Send + 'static, const N: usize> Default for TaskBuilder<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
