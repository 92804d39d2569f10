/// TransferManagerThread - one background thread driving one transfer queue
///
/// State machine per iteration: `Idle` (polling the request channels),
/// `Claimed` (a request was received and is being recorded), `Submitted`
/// (the command slot is executing on the GPU). Command slots are pooled; a
/// slot returns to the pool once its fence signalled, releasing the staging
/// buffer and signal semaphore kept alive for it.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use crossbeam_channel::{Receiver, TryRecvError};
use crate::device::{Buffer, BufferDesc, CommandSlot, Semaphore, TransferDevice, TransferQueue};
use crate::error::{Error, Result};
use crate::task::panic_message;
use crate::{engine_debug, engine_error, engine_trace, engine_warn};
use super::transfer_request::{
    BufferTransferRequest, InterThreadRequest, TextureTransferRequest, TransferJob,
};
use super::transfer_slot::{BufferSlot, TextureSlot};

/// Where a transfer thread is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThreadState {
    Idle,
    Claimed,
    Submitted,
}

/// Request channels served by one thread, polled in order
pub(crate) struct RequestIntake {
    pub(crate) high: Option<Receiver<InterThreadRequest>>,
    pub(crate) standard: Option<Receiver<InterThreadRequest>>,
}

impl RequestIntake {
    fn claim(&self) -> Option<InterThreadRequest> {
        [&self.high, &self.standard]
            .into_iter()
            .flatten()
            .find_map(|receiver| match receiver.try_recv() {
                Ok(request) => Some(request),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
            })
    }

    pub(crate) fn serves_high_priority(&self) -> bool {
        self.high.is_some()
    }
}

/// Command slot whose submission may still be executing
struct InFlight {
    command: Box<dyn CommandSlot>,
    // Kept alive until the fence signalled
    _staging: Arc<dyn Buffer>,
    _signal: Option<Arc<dyn Semaphore>>,
}

/// Settings copied from `TransferConfig`
#[derive(Debug, Clone, Copy)]
pub(crate) struct ThreadSettings {
    pub(crate) idle_sleep: Duration,
    pub(crate) max_command_slots: usize,
}

/// Handle of a running transfer thread
pub(crate) struct TransferManagerThread {
    name: String,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TransferManagerThread {
    pub(crate) fn spawn(
        name: String,
        device: Arc<dyn TransferDevice>,
        queue: Box<dyn TransferQueue>,
        intake: RequestIntake,
        settings: ThreadSettings,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let context = TransferLoop {
            name: name.clone(),
            device,
            queue,
            intake,
            settings,
            running: running.clone(),
            state: ThreadState::Idle,
            available: Vec::new(),
            in_flight: VecDeque::new(),
            command_slots: 0,
        };

        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || context.run())
            .map_err(|e| Error::InitializationFailed(format!("Failed to spawn transfer thread '{}': {}", name, e)))?;

        Ok(Self { name, running, thread: Some(thread) })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Ask the thread to exit after its current request
    pub(crate) fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Stop and wait for the thread (and its in-flight submissions)
    pub(crate) fn join(&mut self) {
        self.request_stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                engine_error!("starlight::TransferManagerThread", "Transfer thread '{}' terminated abnormally", self.name);
            }
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.thread.is_some() && self.running.load(Ordering::Acquire)
    }
}

impl Drop for TransferManagerThread {
    fn drop(&mut self) {
        self.join();
    }
}

/// State owned by the transfer thread
struct TransferLoop {
    name: String,
    device: Arc<dyn TransferDevice>,
    queue: Box<dyn TransferQueue>,
    intake: RequestIntake,
    settings: ThreadSettings,
    running: Arc<AtomicBool>,
    state: ThreadState,
    available: Vec<Box<dyn CommandSlot>>,
    in_flight: VecDeque<InFlight>,
    command_slots: usize,
}

impl TransferLoop {
    fn run(mut self) {
        engine_debug!(
            "starlight::TransferManagerThread",
            "'{}' serving queue {}{}",
            self.name,
            self.queue.queue_index(),
            if self.intake.serves_high_priority() { " (high priority first)" } else { "" }
        );

        while self.running.load(Ordering::Acquire) {
            self.check_for_cleanups();

            match self.intake.claim() {
                Some(request) => {
                    self.state = ThreadState::Claimed;
                    self.process(request);
                    self.state = ThreadState::Idle;
                }
                None => thread::sleep(self.settings.idle_sleep),
            }
        }

        self.shutdown();
    }

    fn process(&mut self, request: InterThreadRequest) {
        engine_trace!("starlight::TransferManagerThread", "'{}' claimed {} request", self.name, request.kind());

        let InterThreadRequest { job, signal } = request;
        let target = match &job {
            TransferJob::Buffer { slot, .. } => FailTarget::Buffer(slot.clone()),
            TransferJob::Texture { slot, .. } => FailTarget::Texture(slot.clone()),
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| match job {
            TransferJob::Buffer { slot, request } => self.transfer_buffer(&slot, request, signal.as_ref()),
            TransferJob::Texture { slot, request } => self.transfer_texture(&slot, request, signal.as_ref()),
        }));

        let error = match result {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => Error::BackendError(format!("transfer panicked: {}", panic_message(payload.as_ref()))),
        };
        engine_error!("starlight::TransferManagerThread", "'{}' {} transfer failed: {}", self.name, target.kind(), error);
        target.fail(error);
    }

    fn transfer_buffer(
        &mut self,
        slot: &BufferSlot,
        mut request: Box<dyn BufferTransferRequest>,
        signal: Option<&Arc<dyn Semaphore>>,
    ) -> Result<()> {
        let size = request.size();
        if size == 0 {
            return Err(Error::InvalidResource("zero-sized buffer transfer".to_string()));
        }

        let staging = self.device.create_buffer(&BufferDesc::staging(size))?;
        request.write_data(staging.as_ref())?;

        let target = match slot.resource() {
            Some(existing) if existing.size() >= size && existing.usage().contains(request.usage()) => existing,
            _ => self.device.create_buffer(&BufferDesc::device_local(size, request.usage()))?,
        };

        let mut command = self.acquire_command_slot()?;
        let submitted = record_and_submit(self.queue.as_ref(), command.as_mut(), signal, |command| {
            request.record_copy(command, &staging, &target)
        });
        self.finish_submission(command, staging, signal, submitted)?;

        engine_trace!("starlight::TransferManagerThread", "'{}' submitted {} byte buffer", self.name, size);
        slot.complete(target);
        Ok(())
    }

    fn transfer_texture(
        &mut self,
        slot: &TextureSlot,
        mut request: Box<dyn TextureTransferRequest>,
        signal: Option<&Arc<dyn Semaphore>>,
    ) -> Result<()> {
        let desc = request.texture_desc();
        let size = desc.byte_size();
        if size == 0 {
            return Err(Error::InvalidResource("zero-sized texture transfer".to_string()));
        }

        let staging = self.device.create_buffer(&BufferDesc::staging(size))?;
        request.write_data(staging.as_ref())?;
        let target = self.device.create_texture(&desc)?;

        let mut command = self.acquire_command_slot()?;
        let submitted = record_and_submit(self.queue.as_ref(), command.as_mut(), signal, |command| {
            request.record_copy(command, &staging, &target)
        });
        self.finish_submission(command, staging, signal, submitted)?;

        engine_trace!(
            "starlight::TransferManagerThread",
            "'{}' submitted {}x{} texture",
            self.name,
            desc.width,
            desc.height
        );
        slot.complete(target);
        Ok(())
    }

    /// Track a submitted slot, or give a failed one back to the pool
    fn finish_submission(
        &mut self,
        mut command: Box<dyn CommandSlot>,
        staging: Arc<dyn Buffer>,
        signal: Option<&Arc<dyn Semaphore>>,
        submitted: Result<()>,
    ) -> Result<()> {
        match submitted {
            Ok(()) => {
                self.in_flight.push_back(InFlight { command, _staging: staging, _signal: signal.cloned() });
                self.state = ThreadState::Submitted;
                Ok(())
            }
            Err(error) => {
                if command.reset().is_ok() {
                    self.available.push(command);
                } else {
                    self.command_slots -= 1;
                }
                Err(error)
            }
        }
    }

    /// Take a free command slot, creating one or waiting for the oldest submission
    fn acquire_command_slot(&mut self) -> Result<Box<dyn CommandSlot>> {
        if let Some(command) = self.available.pop() {
            return Ok(command);
        }

        if self.command_slots < self.settings.max_command_slots.max(1) || self.in_flight.is_empty() {
            let command = self.queue.create_command_slot()?;
            self.command_slots += 1;
            return Ok(command);
        }

        engine_trace!("starlight::TransferManagerThread", "'{}' waiting for oldest command slot", self.name);
        match self.in_flight.pop_front() {
            Some(InFlight { mut command, .. }) => {
                command.wait(None)?;
                command.reset()?;
                Ok(command)
            }
            None => Err(Error::BackendError("no command slot in flight".to_string())),
        }
    }

    /// Recycle every slot whose submission finished
    fn check_for_cleanups(&mut self) {
        let mut still_running = VecDeque::with_capacity(self.in_flight.len());

        while let Some(entry) = self.in_flight.pop_front() {
            match entry.command.is_complete() {
                Ok(true) => {
                    let InFlight { mut command, .. } = entry;
                    match command.reset() {
                        Ok(()) => self.available.push(command),
                        Err(error) => {
                            engine_warn!("starlight::TransferManagerThread", "'{}' dropping command slot: {}", self.name, error);
                            self.command_slots -= 1;
                        }
                    }
                }
                Ok(false) => still_running.push_back(entry),
                Err(error) => {
                    engine_error!("starlight::TransferManagerThread", "'{}' fence query failed: {}", self.name, error);
                    still_running.push_back(entry);
                }
            }
        }

        self.in_flight = still_running;
        if self.in_flight.is_empty() && self.state == ThreadState::Submitted {
            self.state = ThreadState::Idle;
        }
    }

    fn shutdown(&mut self) {
        let mut abandoned = 0;
        for receiver in [&self.intake.high, &self.intake.standard].into_iter().flatten() {
            while let Ok(request) = receiver.try_recv() {
                request.fail(Error::WorkerStopped(format!("transfer thread '{}' stopped", self.name)));
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            engine_warn!("starlight::TransferManagerThread", "'{}' abandoned {} queued requests", self.name, abandoned);
        }

        for entry in self.in_flight.drain(..) {
            if let Err(error) = entry.command.wait(None) {
                engine_error!("starlight::TransferManagerThread", "'{}' failed to wait for submission: {}", self.name, error);
            }
        }
        self.available.clear();
        engine_debug!("starlight::TransferManagerThread", "'{}' stopped", self.name);
    }
}

/// Slot to notify when a transfer fails
enum FailTarget {
    Buffer(Arc<BufferSlot>),
    Texture(Arc<TextureSlot>),
}

impl FailTarget {
    fn kind(&self) -> &'static str {
        match self {
            FailTarget::Buffer(_) => "buffer",
            FailTarget::Texture(_) => "texture",
        }
    }

    fn fail(&self, error: Error) {
        match self {
            FailTarget::Buffer(slot) => slot.fail(error),
            FailTarget::Texture(slot) => slot.fail(error),
        }
    }
}

fn record_and_submit(
    queue: &dyn TransferQueue,
    command: &mut dyn CommandSlot,
    signal: Option<&Arc<dyn Semaphore>>,
    record: impl FnOnce(&mut dyn CommandSlot) -> Result<()>,
) -> Result<()> {
    command.begin()?;
    record(command)?;
    command.end()?;
    queue.submit(command, signal)
}

#[cfg(test)]
#[path = "transfer_manager_thread_tests.rs"]
mod tests;
