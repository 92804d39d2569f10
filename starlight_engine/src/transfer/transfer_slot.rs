/// TransferSlot - destination of asynchronous uploads, shared with the transfer threads

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use crate::device::{Buffer, Texture};
use crate::error::Error;

/// Outcome of the last transfer into a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// Nothing was ever requested
    Idle,
    /// At least one transfer is queued or being recorded
    InProgress,
    /// The last transfer was submitted and its resource published
    Ready,
    /// The last transfer failed on the transfer thread
    Failed(Error),
}

struct SlotState<R> {
    resource: Option<R>,
    status: TransferStatus,
    completed_transfers: u64,
}

/// Resource slot filled by a transfer thread
///
/// The owning thread polls `is_ready` / `is_in_progress` (lock-free) or blocks
/// in `wait`. Several transfers may be queued on the same slot; the slot is in
/// progress until all of them finished.
pub struct TransferSlot<R> {
    pending: AtomicUsize,
    ready: AtomicBool,
    state: Mutex<SlotState<R>>,
    condvar: Condvar,
}

/// Slot receiving a device-local buffer
pub type BufferSlot = TransferSlot<Arc<dyn Buffer>>;

/// Slot receiving a sampled texture
pub type TextureSlot = TransferSlot<Arc<dyn Texture>>;

impl<R: Clone> TransferSlot<R> {
    pub fn new() -> Self {
        Self {
            pending: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
            state: Mutex::new(SlotState {
                resource: None,
                status: TransferStatus::Idle,
                completed_transfers: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    /// A transfer was queued and has not finished yet
    pub fn is_in_progress(&self) -> bool {
        self.pending.load(Ordering::Acquire) > 0
    }

    /// A resource is published and no transfer is pending
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn status(&self) -> TransferStatus {
        self.lock().status.clone()
    }

    /// The last published resource, if any
    ///
    /// A resource stays available while a newer transfer is in progress.
    pub fn resource(&self) -> Option<R> {
        self.lock().resource.clone()
    }

    /// Number of transfers that finished (successfully or not)
    pub fn completed_transfers(&self) -> u64 {
        self.lock().completed_transfers
    }

    /// Block until no transfer is pending; `None` waits forever
    ///
    /// Returns `false` on timeout.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.lock();
        while self.is_in_progress() {
            state = match deadline {
                None => self.condvar.wait(state).unwrap_or_else(|e| e.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.condvar
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        }
        true
    }

    /// Mark a transfer as queued
    pub(crate) fn begin(&self) {
        let mut state = self.lock();
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.ready.store(false, Ordering::Release);
        state.status = TransferStatus::InProgress;
    }

    /// Publish the resource of a finished transfer and wake waiters
    pub(crate) fn complete(&self, resource: R) {
        let mut state = self.lock();
        state.resource = Some(resource);
        self.finish(&mut state, TransferStatus::Ready);
    }

    /// Record a failed transfer and wake waiters
    pub(crate) fn fail(&self, error: Error) {
        let mut state = self.lock();
        self.finish(&mut state, TransferStatus::Failed(error));
    }

    fn finish(&self, state: &mut SlotState<R>, status: TransferStatus) {
        state.completed_transfers += 1;
        let remaining = self.pending.load(Ordering::Acquire).saturating_sub(1);
        self.pending.store(remaining, Ordering::Release);

        let ready = matches!(status, TransferStatus::Ready);
        state.status = if remaining > 0 { TransferStatus::InProgress } else { status };
        self.ready.store(ready && remaining == 0, Ordering::Release);
        self.condvar.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<R>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<R: Clone> Default for TransferSlot<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Clone> std::fmt::Debug for TransferSlot<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSlot")
            .field("in_progress", &self.is_in_progress())
            .field("ready", &self.is_ready())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
#[path = "transfer_slot_tests.rs"]
mod tests;
