use super::*;
use std::thread;

type ValueSlot = TransferSlot<u32>;

#[test]
fn test_new_slot_is_idle() {
    let slot = ValueSlot::new();
    assert!(!slot.is_in_progress());
    assert!(!slot.is_ready());
    assert_eq!(slot.status(), TransferStatus::Idle);
    assert_eq!(slot.resource(), None);
    assert!(slot.wait(Some(Duration::ZERO)));
}

#[test]
fn test_begin_then_complete_publishes_resource() {
    let slot = ValueSlot::new();
    slot.begin();
    assert!(slot.is_in_progress());
    assert!(!slot.is_ready());
    assert_eq!(slot.status(), TransferStatus::InProgress);

    slot.complete(7);
    assert!(!slot.is_in_progress());
    assert!(slot.is_ready());
    assert_eq!(slot.status(), TransferStatus::Ready);
    assert_eq!(slot.resource(), Some(7));
    assert_eq!(slot.completed_transfers(), 1);
}

#[test]
fn test_failure_is_reported_and_keeps_previous_resource() {
    let slot = ValueSlot::new();
    slot.begin();
    slot.complete(1);

    slot.begin();
    slot.fail(Error::OutOfMemory);
    assert!(!slot.is_in_progress());
    assert!(!slot.is_ready());
    assert_eq!(slot.status(), TransferStatus::Failed(Error::OutOfMemory));
    assert_eq!(slot.resource(), Some(1));
}

#[test]
fn test_slot_stays_in_progress_until_every_transfer_finished() {
    let slot = ValueSlot::new();
    slot.begin();
    slot.begin();

    slot.complete(1);
    assert!(slot.is_in_progress());
    assert!(!slot.is_ready());

    slot.complete(2);
    assert!(slot.is_ready());
    assert_eq!(slot.resource(), Some(2));
}

#[test]
fn test_wait_times_out_while_in_progress() {
    let slot = ValueSlot::new();
    slot.begin();
    assert!(!slot.wait(Some(Duration::from_millis(10))));
}

#[test]
fn test_wait_wakes_when_other_thread_completes() {
    let slot = Arc::new(ValueSlot::new());
    slot.begin();

    let producer = {
        let slot = slot.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            slot.complete(42);
        })
    };

    assert!(slot.wait(Some(Duration::from_secs(5))));
    assert_eq!(slot.resource(), Some(42));
    producer.join().unwrap();
}
