/// CompleteTask - finished work to be processed on the owning thread
///
/// Same inline storage scheme as `Task`. Workers push complete tasks on the
/// task manager's completion channel; the device context runs them once per frame.

use crate::error::{Error, Result};
use super::inline_payload::InlinePayload;

/// Default inline storage size of a `CompleteTask`, in bytes
pub const DEFAULT_COMPLETE_TASK_BYTES: usize = 128;

struct CompleteSlot<P> {
    payload: P,
    execute: fn(&mut P),
}

unsafe fn run_complete_slot<P>(ptr: *mut u8) {
    // SAFETY: registered together with a CompleteSlot<P> written at `ptr`
    let slot = unsafe { &mut *ptr.cast::<CompleteSlot<P>>() };
    (slot.execute)(&mut slot.payload);
}

pub struct CompleteTask<const N: usize = DEFAULT_COMPLETE_TASK_BYTES> {
    payload: InlinePayload<N>,
    run_fn: Option<unsafe fn(*mut u8)>,
}

impl<const N: usize> CompleteTask<N> {
    pub fn builder<P: Send + 'static>() -> CompleteTaskBuilder<P, N> {
        CompleteTaskBuilder::new()
    }

    /// Build a complete task from a closure
    pub fn from_fn<F: FnMut() + Send + 'static>(f: F) -> Result<Self> {
        CompleteTaskBuilder::<F, N>::new()
            .payload(f)
            .execute(|f: &mut F| f())
            .build()
    }

    pub fn is_armed(&self) -> bool {
        self.payload.is_armed()
    }

    pub fn run(&mut self) {
        if let Some(run_fn) = self.run_fn {
            let ptr = self.payload.as_mut_ptr();
            // SAFETY: run_fn was monomorphized for the slot stored in `payload`
            unsafe { run_fn(ptr) };
        }
    }
}

impl<const N: usize> Default for CompleteTask<N> {
    fn default() -> Self {
        Self {
            payload: InlinePayload::empty(),
            run_fn: None,
        }
    }
}

impl<const N: usize> std::fmt::Debug for CompleteTask<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompleteTask")
            .field("capacity", &N)
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Builder for `CompleteTask`; `payload` and `execute` are required
pub struct CompleteTaskBuilder<P, const N: usize = DEFAULT_COMPLETE_TASK_BYTES> {
    payload: Option<P>,
    execute: Option<fn(&mut P)>,
}

impl<P: Send + 'static, const N: usize> CompleteTaskBuilder<P, N> {
    pub fn new() -> Self {
        Self { payload: None, execute: None }
    }

    pub fn payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn execute(mut self, execute: fn(&mut P)) -> Self {
        self.execute = Some(execute);
        self
    }

    pub fn build(self) -> Result<CompleteTask<N>> {
        InlinePayload::<N>::check_fits::<CompleteSlot<P>>()?;
        let payload = self.payload
            .ok_or_else(|| Error::InvalidTask("complete task built without a payload".to_string()))?;
        let execute = self.execute
            .ok_or_else(|| Error::InvalidTask("complete task built without an execute function".to_string()))?;

        Ok(CompleteTask {
            payload: InlinePayload::new(CompleteSlot { payload, execute })?,
            run_fn: Some(run_complete_slot::<P>),
        })
    }
}

impl<P: Send + 'static, const N: usize> Default for CompleteTaskBuilder<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "complete_task_tests.rs"]
mod tests;
