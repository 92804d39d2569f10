/// LinearHandleContainer - fixed-capacity arena with id recycling
///
/// Records live in a flat array indexed directly by handle id. Removed ids go
/// on a free-list and are reused before the container grows toward `N`.
/// Running out of ids is an error the caller is expected to treat as fatal:
/// the capacity is a sizing decision, not a runtime condition.

use crate::engine_error;
use crate::error::{Error, Result};
use crate::utils::SlotAllocator;
use super::{Handle, HandleContainer, HandleType};

pub struct LinearHandleContainer<T, const N: usize> {
    handle_type: HandleType,
    records: Box<[T]>,
    occupied: Box<[bool]>,
    ids: SlotAllocator,
}

impl<T: Default, const N: usize> LinearHandleContainer<T, N> {
    /// Create a container with all `N` slots set to `T::default()`
    pub fn new(handle_type: HandleType) -> Self {
        Self {
            handle_type,
            records: (0..N).map(|_| T::default()).collect(),
            occupied: vec![false; N].into_boxed_slice(),
            ids: SlotAllocator::new(N as u32),
        }
    }

    /// Maximum number of records
    pub fn capacity(&self) -> usize {
        N
    }

    fn check_handle(&self, handle: Handle) {
        debug_assert_eq!(
            handle.handle_type(), self.handle_type,
            "handle {} looked up in a {:?} container", handle, self.handle_type
        );
    }
}

impl<T: Default, const N: usize> HandleContainer<T> for LinearHandleContainer<T, N> {
    fn handle_type(&self) -> HandleType {
        self.handle_type
    }

    fn insert(&mut self, record: T) -> Result<Handle> {
        let Some(id) = self.ids.alloc() else {
            engine_error!(
                "starlight::LinearHandleContainer",
                "No free {:?} slot left (capacity {})", self.handle_type, N
            );
            return Err(Error::CapacityExhausted { capacity: N });
        };
        self.records[id as usize] = record;
        self.occupied[id as usize] = true;
        Ok(Handle::new(self.handle_type, id))
    }

    fn get(&self, handle: Handle) -> &T {
        self.check_handle(handle);
        &self.records[handle.id() as usize]
    }

    fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.check_handle(handle);
        &mut self.records[handle.id() as usize]
    }

    fn try_get(&self, handle: Handle) -> Option<&T> {
        if handle.handle_type() != self.handle_type {
            return None;
        }
        self.records.get(handle.id() as usize)
    }

    fn remove(&mut self, handle: Handle) -> Option<T> {
        self.check_handle(handle);
        let index = handle.id() as usize;
        if !self.occupied.get(index).copied().unwrap_or(false) {
            return None;
        }
        self.occupied[index] = false;
        self.ids.free(handle.id());
        Some(std::mem::take(&mut self.records[index]))
    }

    fn handles(&self) -> Vec<Handle> {
        self.occupied
            .iter()
            .enumerate()
            .filter(|(_, occupied)| **occupied)
            .map(|(id, _)| Handle::new(self.handle_type, id as u32))
            .collect()
    }

    fn len(&self) -> usize {
        self.ids.len() as usize
    }
}

#[cfg(test)]
#[path = "linear_handle_container_tests.rs"]
mod tests;
