use super::*;
use crate::device::mock_transfer_device::{MockBuffer, MockSemaphore, MockTransferDevice};
use crate::device::{Buffer, BufferUsage};
use crate::transfer::{BufferData, TransferStatus};
use std::thread;

const TIMEOUT: Option<Duration> = Some(Duration::from_secs(5));

fn fast_config() -> TransferConfig {
    TransferConfig { idle_sleep: Duration::from_millis(1), ..TransferConfig::default() }
}

fn worker(device: &Arc<MockTransferDevice>) -> TransferWorker {
    TransferWorker::new(device.clone(), fast_config()).unwrap()
}

fn contents(buffer: &Arc<dyn Buffer>) -> Vec<u8> {
    buffer.as_any().downcast_ref::<MockBuffer>().unwrap().contents()
}

// ============================================================================
// Configuration and setup
// ============================================================================

#[test]
fn test_default_config() {
    let config = TransferConfig::default();
    assert_eq!(config.request_capacity, 128);
    assert_eq!(config.idle_sleep, Duration::from_millis(2));
    assert_eq!(config.max_command_slots, 8);
}

#[test]
fn test_one_thread_per_transfer_queue() {
    let device = Arc::new(MockTransferDevice::new(3));
    let transfer = worker(&device);
    assert_eq!(transfer.thread_count(), 3);
    assert_eq!(
        transfer.thread_names(),
        vec!["starlight-transfer-0", "starlight-transfer-1", "starlight-transfer-2"]
    );
    assert!(transfer.is_running());
}

#[test]
fn test_device_without_transfer_queue_is_rejected() {
    let device = Arc::new(MockTransferDevice::new(0));
    let result = TransferWorker::new(device, fast_config());
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn test_upload_of_1024_u32_reads_back_identically() {
    let device = Arc::new(MockTransferDevice::new(1));
    let transfer = worker(&device);
    let slot = Arc::new(BufferSlot::new());
    let semaphore = device.create_semaphore().unwrap();
    let values: Vec<u32> = (0..1024).collect();

    transfer
        .add_buffer(
            &slot,
            Some(semaphore.clone()),
            Box::new(BufferData::from_slice(&values, BufferUsage::STORAGE)),
            false,
        )
        .unwrap();
    assert!(slot.wait(TIMEOUT));

    assert!(slot.is_ready());
    let buffer = slot.resource().unwrap();
    assert_eq!(buffer.size(), 4096);
    let read_back: Vec<u32> = contents(&buffer)
        .chunks_exact(4)
        .map(|bytes| u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect();
    assert_eq!(read_back, values);
    assert!(semaphore.as_any().downcast_ref::<MockSemaphore>().unwrap().is_signalled());

    // Staging buffers are released by the thread's cleanup pass
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while device.live_staging_buffers() > 0 && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(device.live_staging_buffers(), 0);
}

#[test]
fn test_many_uploads_across_threads() {
    let device = Arc::new(MockTransferDevice::new(2));
    let transfer = worker(&device);

    let slots: Vec<Arc<BufferSlot>> = (0..32).map(|_| Arc::new(BufferSlot::new())).collect();
    for (i, slot) in slots.iter().enumerate() {
        let data = vec![i as u8; 16 + i];
        transfer
            .add_buffer(slot, None, Box::new(BufferData::new(data, BufferUsage::VERTEX)), i % 4 == 0)
            .unwrap();
    }

    for (i, slot) in slots.iter().enumerate() {
        assert!(slot.wait(TIMEOUT), "slot {} timed out", i);
        assert_eq!(contents(&slot.resource().unwrap()), vec![i as u8; 16 + i]);
    }
}

#[test]
fn test_failed_upload_wakes_waiters() {
    let device = Arc::new(MockTransferDevice::new(1));
    let transfer = worker(&device);
    let slot = Arc::new(BufferSlot::new());

    device.fail_next_buffer();
    transfer
        .add_buffer(&slot, None, Box::new(BufferData::new(vec![1; 8], BufferUsage::UNIFORM)), false)
        .unwrap();

    assert!(slot.wait(TIMEOUT));
    assert_eq!(slot.status(), TransferStatus::Failed(Error::OutOfMemory));
    assert!(!slot.is_ready());
    assert!(transfer.is_running());

    // The thread keeps serving requests after a failure
    transfer
        .add_buffer(&slot, None, Box::new(BufferData::new(vec![2; 8], BufferUsage::UNIFORM)), false)
        .unwrap();
    assert!(slot.wait(TIMEOUT));
    assert!(slot.is_ready());
}

// ============================================================================
// Priority routing
// ============================================================================

#[test]
fn test_high_priority_is_served_by_thread_zero() {
    let device = Arc::new(MockTransferDevice::new(3));
    let transfer = worker(&device);

    let slots: Vec<Arc<BufferSlot>> = (0..6).map(|_| Arc::new(BufferSlot::new())).collect();
    for slot in &slots {
        transfer
            .add_buffer(slot, None, Box::new(BufferData::new(vec![1; 4], BufferUsage::VERTEX)), true)
            .unwrap();
    }
    for slot in &slots {
        assert!(slot.wait(TIMEOUT));
    }

    let threads = device.submit_threads();
    assert_eq!(threads.len(), 6);
    assert!(threads.iter().all(|name| name == "starlight-transfer-0"));
}

#[test]
fn test_single_queue_serves_both_priorities() {
    let device = Arc::new(MockTransferDevice::new(1));
    let transfer = worker(&device);
    let high = Arc::new(BufferSlot::new());
    let standard = Arc::new(BufferSlot::new());

    transfer.add_buffer(&standard, None, Box::new(BufferData::new(vec![1; 4], BufferUsage::VERTEX)), false).unwrap();
    transfer.add_buffer(&high, None, Box::new(BufferData::new(vec![2; 4], BufferUsage::VERTEX)), true).unwrap();

    assert!(high.wait(TIMEOUT));
    assert!(standard.wait(TIMEOUT));
    assert!(high.is_ready() && standard.is_ready());
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn test_add_after_stop_fails_slot() {
    let device = Arc::new(MockTransferDevice::new(1));
    let mut transfer = worker(&device);
    transfer.stop();
    assert!(!transfer.is_running());

    let slot = Arc::new(BufferSlot::new());
    let result = transfer.add_buffer(&slot, None, Box::new(BufferData::new(vec![1], BufferUsage::VERTEX)), false);
    assert!(matches!(result, Err(Error::WorkerStopped(_))));
    assert!(!slot.is_in_progress());
    assert!(matches!(slot.status(), TransferStatus::Failed(Error::WorkerStopped(_))));
}

#[test]
fn test_stop_waits_for_pending_gpu_work() {
    let device = Arc::new(MockTransferDevice::new(1));
    device.set_auto_complete(false);
    let mut transfer = worker(&device);
    let slot = Arc::new(BufferSlot::new());

    transfer.add_buffer(&slot, None, Box::new(BufferData::new(vec![1; 4], BufferUsage::VERTEX)), false).unwrap();
    assert!(slot.wait(TIMEOUT));

    let completer = {
        let device = device.clone();
        thread::spawn(move || {
            while device.pending_submissions() == 0 {
                thread::sleep(Duration::from_millis(1));
            }
            thread::sleep(Duration::from_millis(20));
            device.complete_pending()
        })
    };

    transfer.stop();
    assert_eq!(completer.join().unwrap(), 1);
    assert_eq!(device.live_staging_buffers(), 0);
}
