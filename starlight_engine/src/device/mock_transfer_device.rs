/// Mock transfer device for unit tests (no GPU required)
///
/// Copies are executed on the CPU when a command slot is submitted. With
/// `set_auto_complete(false)` submissions stay pending (fences unsignalled)
/// until `complete_pending` is called, which lets tests observe in-flight state.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::{Duration, Instant};
use crate::device::{
    Buffer, BufferCopyRegion, BufferDesc, BufferTextureCopyRegion, CommandSlot, MemoryLocation,
    BufferUsage, QueueFamilies, Semaphore, Texture, TextureDesc, TextureInfo, TransferDevice,
    TransferQueue,
};
use crate::error::{Error, Result};
use crate::engine_bail;

// ============================================================================
// Mock Buffer
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub desc: BufferDesc,
    data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    fn new(desc: &BufferDesc) -> Self {
        Self {
            desc: desc.clone(),
            data: Mutex::new(vec![0; desc.size as usize]),
        }
    }

    /// Buffer contents regardless of memory location
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.desc.size
    }

    fn usage(&self) -> BufferUsage {
        self.desc.usage
    }

    fn location(&self) -> MemoryLocation {
        self.desc.location
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !self.desc.location.is_host_visible() {
            engine_bail!("starlight::mock", "write to a device-local buffer");
        }
        let mut contents = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            engine_bail!("starlight::mock", "write of {} bytes at {} overflows buffer", data.len(), offset);
        }
        contents[start..end].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        if !self.desc.location.is_host_visible() {
            engine_bail!("starlight::mock", "read from a device-local buffer");
        }
        let contents = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + out.len();
        if end > contents.len() {
            engine_bail!("starlight::mock", "read of {} bytes at {} overflows buffer", out.len(), offset);
        }
        out.copy_from_slice(&contents[start..end]);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub info: TextureInfo,
    data: Mutex<Vec<u8>>,
    layouts: Mutex<Vec<&'static str>>,
}

impl MockTexture {
    fn new(desc: &TextureDesc) -> Self {
        Self {
            info: TextureInfo::from(desc),
            data: Mutex::new(vec![0; desc.byte_size() as usize]),
            layouts: Mutex::new(vec!["UNDEFINED"]),
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    /// Every layout the texture went through, oldest first
    pub fn layouts(&self) -> Vec<&'static str> {
        self.layouts.lock().unwrap().clone()
    }
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Semaphore
// ============================================================================

/// Binary semaphore state: `armed` from the submit of a signal until `consume`
#[derive(Debug, Default)]
pub struct MockSemaphore {
    armed: AtomicBool,
    signalled: AtomicBool,
}

impl MockSemaphore {
    pub fn is_signalled(&self) -> bool {
        self.signalled.load(Ordering::Acquire)
    }

    /// Act as a GPU wait: the semaphore can be signalled again afterwards
    pub fn consume(&self) {
        self.signalled.store(false, Ordering::Release);
        self.armed.store(false, Ordering::Release);
    }

    fn arm(&self) -> Result<()> {
        if self.armed.swap(true, Ordering::AcqRel) {
            engine_bail!("starlight::mock", "semaphore signalled again before being waited");
        }
        Ok(())
    }
}

impl Semaphore for MockSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Fence
// ============================================================================

#[derive(Debug)]
struct MockFence {
    signalled: Mutex<bool>,
    condvar: Condvar,
}

impl MockFence {
    fn new(signalled: bool) -> Self {
        Self { signalled: Mutex::new(signalled), condvar: Condvar::new() }
    }

    fn signal(&self) {
        *self.signalled.lock().unwrap() = true;
        self.condvar.notify_all();
    }

    fn is_signalled(&self) -> bool {
        *self.signalled.lock().unwrap()
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut signalled = self.signalled.lock().unwrap();
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        while !*signalled {
            match deadline {
                None => signalled = self.condvar.wait(signalled).unwrap(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    signalled = self.condvar.wait_timeout(signalled, deadline - now).unwrap().0;
                }
            }
        }
        true
    }
}

// ============================================================================
// Mock commands
// ============================================================================

enum MockCommand {
    CopyBuffer {
        src: Arc<dyn Buffer>,
        dst: Arc<dyn Buffer>,
        region: BufferCopyRegion,
    },
    CopyBufferToTexture {
        src: Arc<dyn Buffer>,
        dst: Arc<dyn Texture>,
        region: BufferTextureCopyRegion,
    },
}

impl MockCommand {
    fn execute(&self) {
        match self {
            MockCommand::CopyBuffer { src, dst, region } => {
                let src = downcast_buffer(src);
                let dst = downcast_buffer(dst);
                let data = src.data.lock().unwrap();
                let mut target = dst.data.lock().unwrap();
                let from = region.src_offset as usize;
                let to = region.dst_offset as usize;
                let size = region.size as usize;
                target[to..to + size].copy_from_slice(&data[from..from + size]);
            }
            MockCommand::CopyBufferToTexture { src, dst, region } => {
                let src = downcast_buffer(src);
                let dst = dst.as_any().downcast_ref::<MockTexture>().unwrap();
                let data = src.data.lock().unwrap();
                let mut target = dst.data.lock().unwrap();

                let layer_size = dst.info.width as usize
                    * dst.info.height as usize
                    * dst.info.format.bytes_per_pixel() as usize;
                let start = region.base_layer as usize * layer_size;
                let size = region.layer_count as usize * layer_size;
                let from = region.buffer_offset as usize;
                target[start..start + size].copy_from_slice(&data[from..from + size]);
            }
        }
    }
}

fn downcast_buffer(buffer: &Arc<dyn Buffer>) -> &MockBuffer {
    buffer.as_any().downcast_ref::<MockBuffer>().unwrap()
}

struct PendingSubmission {
    commands: Vec<MockCommand>,
    fence: Arc<MockFence>,
    signal: Option<Arc<dyn Semaphore>>,
}

impl PendingSubmission {
    fn complete(self) {
        for command in &self.commands {
            command.execute();
        }
        if let Some(semaphore) = &self.signal {
            if let Some(semaphore) = semaphore.as_any().downcast_ref::<MockSemaphore>() {
                semaphore.signalled.store(true, Ordering::Release);
            }
        }
        self.fence.signal();
    }
}

// ============================================================================
// Mock CommandSlot
// ============================================================================

pub struct MockCommandSlot {
    commands: Vec<MockCommand>,
    recording: bool,
    fence: Arc<MockFence>,
}

impl CommandSlot for MockCommandSlot {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!("starlight::mock", "begin called on a slot already recording");
        }
        self.commands.clear();
        self.recording = true;
        Ok(())
    }

    fn copy_buffer(&mut self, src: &Arc<dyn Buffer>, dst: &Arc<dyn Buffer>, region: BufferCopyRegion) -> Result<()> {
        if region.src_offset + region.size > src.size() || region.dst_offset + region.size > dst.size() {
            engine_bail!("starlight::mock", "copy region out of bounds");
        }
        self.commands.push(MockCommand::CopyBuffer { src: src.clone(), dst: dst.clone(), region });
        Ok(())
    }

    fn copy_buffer_to_texture(
        &mut self,
        src: &Arc<dyn Buffer>,
        dst: &Arc<dyn Texture>,
        region: BufferTextureCopyRegion,
    ) -> Result<()> {
        if let Some(texture) = dst.as_any().downcast_ref::<MockTexture>() {
            let mut layouts = texture.layouts.lock().unwrap();
            layouts.push("TRANSFER_DST_OPTIMAL");
            layouts.push("SHADER_READ_ONLY_OPTIMAL");
        }
        self.commands.push(MockCommand::CopyBufferToTexture { src: src.clone(), dst: dst.clone(), region });
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            engine_bail!("starlight::mock", "end called on a slot that is not recording");
        }
        self.recording = false;
        Ok(())
    }

    fn is_complete(&self) -> Result<bool> {
        Ok(self.fence.is_signalled())
    }

    fn wait(&self, timeout: Option<Duration>) -> Result<bool> {
        Ok(self.fence.wait(timeout))
    }

    fn reset(&mut self) -> Result<()> {
        self.commands.clear();
        self.recording = false;
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Mock TransferQueue
// ============================================================================

pub struct MockTransferQueue {
    index: u32,
    state: Arc<MockState>,
}

impl TransferQueue for MockTransferQueue {
    fn queue_index(&self) -> u32 {
        self.index
    }

    fn create_command_slot(&self) -> Result<Box<dyn CommandSlot>> {
        self.state.command_slots_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCommandSlot {
            commands: Vec::new(),
            recording: false,
            fence: Arc::new(MockFence::new(true)),
        }))
    }

    fn submit(&self, slot: &mut dyn CommandSlot, signal: Option<&Arc<dyn Semaphore>>) -> Result<()> {
        let slot = match slot.as_any_mut().downcast_mut::<MockCommandSlot>() {
            Some(slot) => slot,
            None => return Err(Error::BackendError("foreign command slot".to_string())),
        };
        if slot.recording {
            engine_bail!("starlight::mock", "submit called on a slot still recording");
        }
        if let Some(semaphore) = signal.and_then(|semaphore| semaphore.as_any().downcast_ref::<MockSemaphore>()) {
            semaphore.arm()?;
        }

        slot.fence = Arc::new(MockFence::new(false));
        let submission = PendingSubmission {
            commands: std::mem::take(&mut slot.commands),
            fence: slot.fence.clone(),
            signal: signal.cloned(),
        };

        self.state.submissions.fetch_add(1, Ordering::SeqCst);
        self.state.submit_threads.lock().unwrap().push(
            std::thread::current().name().unwrap_or("unnamed").to_string(),
        );

        if self.state.auto_complete.load(Ordering::SeqCst) {
            submission.complete();
        } else {
            self.state.pending.lock().unwrap().push(submission);
        }
        Ok(())
    }
}

// ============================================================================
// Mock TransferDevice
// ============================================================================

struct MockState {
    queue_count: u32,
    families: QueueFamilies,
    auto_complete: AtomicBool,
    fail_next_buffer: AtomicBool,
    pending: Mutex<Vec<PendingSubmission>>,
    staging: Mutex<Vec<Weak<MockBuffer>>>,
    buffers_created: AtomicUsize,
    textures_created: AtomicUsize,
    command_slots_created: AtomicUsize,
    submissions: AtomicUsize,
    submit_threads: Mutex<Vec<String>>,
}

pub struct MockTransferDevice {
    state: Arc<MockState>,
}

impl MockTransferDevice {
    pub fn new(queue_count: u32) -> Self {
        Self::with_families(queue_count, QueueFamilies { graphics: 0, transfer: 1 })
    }

    pub fn with_families(queue_count: u32, families: QueueFamilies) -> Self {
        Self {
            state: Arc::new(MockState {
                queue_count,
                families,
                auto_complete: AtomicBool::new(true),
                fail_next_buffer: AtomicBool::new(false),
                pending: Mutex::new(Vec::new()),
                staging: Mutex::new(Vec::new()),
                buffers_created: AtomicUsize::new(0),
                textures_created: AtomicUsize::new(0),
                command_slots_created: AtomicUsize::new(0),
                submissions: AtomicUsize::new(0),
                submit_threads: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Execute submissions immediately (default) or keep them pending
    pub fn set_auto_complete(&self, auto_complete: bool) {
        self.state.auto_complete.store(auto_complete, Ordering::SeqCst);
    }

    /// Execute every pending submission and signal its fence; returns how many ran
    pub fn complete_pending(&self) -> usize {
        let pending: Vec<PendingSubmission> = std::mem::take(&mut *self.state.pending.lock().unwrap());
        let count = pending.len();
        for submission in pending {
            submission.complete();
        }
        count
    }

    pub fn pending_submissions(&self) -> usize {
        self.state.pending.lock().unwrap().len()
    }

    /// Make the next `create_buffer` call fail with `OutOfMemory`
    pub fn fail_next_buffer(&self) {
        self.state.fail_next_buffer.store(true, Ordering::SeqCst);
    }

    /// Staging buffers that are still referenced somewhere
    pub fn live_staging_buffers(&self) -> usize {
        self.state.staging.lock().unwrap().iter().filter(|buffer| buffer.strong_count() > 0).count()
    }

    pub fn buffers_created(&self) -> usize {
        self.state.buffers_created.load(Ordering::SeqCst)
    }

    pub fn textures_created(&self) -> usize {
        self.state.textures_created.load(Ordering::SeqCst)
    }

    pub fn command_slots_created(&self) -> usize {
        self.state.command_slots_created.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> usize {
        self.state.submissions.load(Ordering::SeqCst)
    }

    /// Names of the threads that submitted, in submission order
    pub fn submit_threads(&self) -> Vec<String> {
        self.state.submit_threads.lock().unwrap().clone()
    }
}

impl TransferDevice for MockTransferDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        if self.state.fail_next_buffer.swap(false, Ordering::SeqCst) {
            return Err(Error::OutOfMemory);
        }
        if desc.size == 0 {
            return Err(Error::InvalidResource("zero-sized buffer".to_string()));
        }

        let buffer = Arc::new(MockBuffer::new(desc));
        if desc.location == MemoryLocation::CpuToGpu {
            self.state.staging.lock().unwrap().push(Arc::downgrade(&buffer));
        }
        self.state.buffers_created.fetch_add(1, Ordering::SeqCst);
        Ok(buffer)
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.byte_size() == 0 {
            return Err(Error::InvalidResource("zero-sized texture".to_string()));
        }
        self.state.textures_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockTexture::new(desc)))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(Arc::new(MockSemaphore::default()))
    }

    fn transfer_queue_count(&self) -> u32 {
        self.state.queue_count
    }

    fn create_transfer_queue(&self, index: u32) -> Result<Box<dyn TransferQueue>> {
        if index >= self.state.queue_count {
            engine_bail!("starlight::mock", "transfer queue {} out of range", index);
        }
        Ok(Box::new(MockTransferQueue { index, state: self.state.clone() }))
    }

    fn queue_families(&self) -> QueueFamilies {
        self.state.families
    }
}

#[cfg(test)]
#[path = "mock_transfer_device_tests.rs"]
mod tests;
