use super::*;
use crate::handle::{LinearHandleContainer, MappedHandleContainer};
use std::cell::RefCell;

/// Stand-in for a device that records which resources were released
#[derive(Default)]
struct FakeDevice {
    released: RefCell<Vec<u32>>,
}

#[derive(Default)]
struct GpuRecord {
    resource_id: u32,
    cleaned: bool,
}

impl Cleanup for GpuRecord {
    type Device = FakeDevice;

    fn cleanup(&mut self, device: &FakeDevice) {
        self.cleaned = true;
        device.released.borrow_mut().push(self.resource_id);
    }
}

#[derive(Default)]
struct CpuRecord {
    counter: std::rc::Rc<RefCell<u32>>,
}

impl Cleanup for CpuRecord {
    type Device = ();

    fn cleanup(&mut self, _device: &()) {
        *self.counter.borrow_mut() += 1;
    }
}

#[test]
fn test_remove_runs_device_cleanup() {
    let device = FakeDevice::default();
    let mut container = ManagedHandleContainer::new(
        LinearHandleContainer::<GpuRecord, 4>::new(HandleType::Buffer),
    );
    let handle = container.insert(GpuRecord { resource_id: 42, cleaned: false }).unwrap();

    assert!(container.remove(handle, &device));
    assert_eq!(*device.released.borrow(), vec![42]);
    assert!(container.is_empty());
}

#[test]
fn test_remove_unoccupied_slot_skips_cleanup() {
    let device = FakeDevice::default();
    let mut container = ManagedHandleContainer::new(
        LinearHandleContainer::<GpuRecord, 4>::new(HandleType::Buffer),
    );
    let handle = container.insert(GpuRecord { resource_id: 1, cleaned: false }).unwrap();
    container.remove(handle, &device);

    assert!(!container.remove(handle, &device));
    assert_eq!(device.released.borrow().len(), 1);
}

#[test]
fn test_deviceless_cleanup_on_mapped_storage() {
    let counter = std::rc::Rc::new(RefCell::new(0));
    let mut container = ManagedHandleContainer::new(MappedHandleContainer::new(HandleType::Object));
    let a = container.insert(CpuRecord { counter: counter.clone() }).unwrap();
    let _b = container.insert(CpuRecord { counter: counter.clone() }).unwrap();

    container.remove(a, &());
    assert_eq!(*counter.borrow(), 1);

    container.cleanup_all(&());
    assert_eq!(*counter.borrow(), 2);
    assert!(container.is_empty());
}

#[test]
fn test_get_and_get_mut_pass_through() {
    let mut container = ManagedHandleContainer::new(
        LinearHandleContainer::<GpuRecord, 2>::new(HandleType::Texture),
    );
    let handle = container.insert(GpuRecord { resource_id: 3, cleaned: false }).unwrap();
    container.get_mut(handle).resource_id = 4;
    assert_eq!(container.get(handle).resource_id, 4);
    assert!(!container.get(handle).cleaned);
    assert_eq!(container.handle_type(), HandleType::Texture);
}
