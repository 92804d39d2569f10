use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn noop() -> Task {
    Task::from_fn(|| {}).unwrap()
}

#[test]
fn test_fetch_returns_tasks_of_that_frame_once() {
    let mut scheduler = FrameScheduler::new();
    scheduler.schedule(7, noop());
    scheduler.schedule(7, noop());
    scheduler.schedule(7, noop());

    assert_eq!(scheduler.fetch_tasks_for_frame(7).len(), 3);
    assert_eq!(scheduler.fetch_tasks_for_frame(7).len(), 0);
    assert_eq!(scheduler.fetch_tasks_for_frame(8).len(), 0);
    assert!(scheduler.is_empty());
}

#[test]
fn test_frames_are_kept_apart() {
    let mut scheduler = FrameScheduler::new();
    scheduler.schedule(3, noop());
    scheduler.schedule(5, noop());
    scheduler.schedule(5, noop());

    assert_eq!(scheduler.len(), 3);
    assert_eq!(scheduler.tasks_for_frame(5), 2);
    assert_eq!(scheduler.next_frame(), Some(3));

    assert_eq!(scheduler.fetch_tasks_for_frame(3).len(), 1);
    assert_eq!(scheduler.next_frame(), Some(5));
    assert_eq!(scheduler.len(), 2);
}

#[test]
fn test_fetch_preserves_scheduling_order() {
    let mut scheduler = FrameScheduler::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..4 {
        let order = order.clone();
        scheduler.schedule(1, Task::from_fn(move || order.lock().unwrap().push(i)).unwrap());
    }

    for mut task in scheduler.fetch_tasks_for_frame(1) {
        task.run();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn test_clear_drops_pending_tasks() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut scheduler = FrameScheduler::new();
    for frame in 0..3 {
        let task: Task = Task::builder::<Arc<AtomicUsize>>()
            .payload(drops.clone())
            .execute(|_| {})
            .destroy(|drops| {
                drops.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();
        scheduler.schedule(frame, task);
    }

    scheduler.clear();
    assert_eq!(drops.load(Ordering::SeqCst), 3);
    assert!(scheduler.is_empty());
}
