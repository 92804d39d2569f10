/// ManagedHandleContainer - handle container that cleans records up on removal
///
/// GPU-backed records must release their resources in a device-aware order,
/// so removal goes through `Cleanup::cleanup` before the record is dropped.

use std::marker::PhantomData;
use crate::error::Result;
use super::{Handle, HandleContainer, HandleType};

/// Records stored in a `ManagedHandleContainer`
///
/// Records that need a device to release their resources set `Device` to the
/// device type; records that don't use `()`.
pub trait Cleanup {
    /// Collaborator passed to `cleanup`
    type Device: ?Sized;

    /// Release everything the record owns
    fn cleanup(&mut self, device: &Self::Device);
}

/// Wraps a linear or mapped container and runs `Cleanup` on remove
pub struct ManagedHandleContainer<T: Cleanup, S: HandleContainer<T>> {
    storage: S,
    _record: PhantomData<T>,
}

impl<T: Cleanup, S: HandleContainer<T>> ManagedHandleContainer<T, S> {
    /// Manage records stored in `storage`
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            _record: PhantomData,
        }
    }

    pub fn handle_type(&self) -> HandleType {
        self.storage.handle_type()
    }

    pub fn insert(&mut self, record: T) -> Result<Handle> {
        self.storage.insert(record)
    }

    pub fn get(&self, handle: Handle) -> &T {
        self.storage.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.storage.get_mut(handle)
    }

    pub fn try_get(&self, handle: Handle) -> Option<&T> {
        self.storage.try_get(handle)
    }

    pub fn try_get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if self.storage.try_get(handle).is_some() {
            Some(self.storage.get_mut(handle))
        } else {
            None
        }
    }

    /// Clean the record up, then free its slot
    ///
    /// Returns false if the slot was not occupied.
    pub fn remove(&mut self, handle: Handle, device: &T::Device) -> bool {
        match self.storage.remove(handle) {
            Some(mut record) => {
                record.cleanup(device);
                true
            }
            None => false,
        }
    }

    /// Clean up and remove every record
    pub fn cleanup_all(&mut self, device: &T::Device) {
        for handle in self.storage.handles() {
            self.remove(handle, device);
        }
    }

    pub fn handles(&self) -> Vec<Handle> {
        self.storage.handles()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Underlying storage (for container-specific queries such as iteration)
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

#[cfg(test)]
#[path = "managed_handle_container_tests.rs"]
mod tests;
