/// MappedHandleContainer - unbounded hash-map backed arena
///
/// Ids come from a monotonic counter and are never reused within the
/// lifetime of the container, so a stale handle can never alias a newer record.

use rustc_hash::FxHashMap;
use crate::error::Result;
use super::{Handle, HandleContainer, HandleType};

pub struct MappedHandleContainer<T> {
    handle_type: HandleType,
    records: FxHashMap<u32, T>,
    next_id: u32,
}

impl<T> MappedHandleContainer<T> {
    /// Create an empty container
    pub fn new(handle_type: HandleType) -> Self {
        Self {
            handle_type,
            records: FxHashMap::default(),
            next_id: 0,
        }
    }

    /// Whether `handle` refers to a live record
    pub fn contains(&self, handle: Handle) -> bool {
        handle.handle_type() == self.handle_type && self.records.contains_key(&handle.id())
    }

    /// Iterate over live records with their handles (unordered)
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        let handle_type = self.handle_type;
        self.records.iter().map(move |(id, record)| (Handle::new(handle_type, *id), record))
    }

    /// Mutable iteration over live records with their handles (unordered)
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> + '_ {
        let handle_type = self.handle_type;
        self.records.iter_mut().map(move |(id, record)| (Handle::new(handle_type, *id), record))
    }

    fn check_handle(&self, handle: Handle) {
        debug_assert_eq!(
            handle.handle_type(), self.handle_type,
            "handle {} looked up in a {:?} container", handle, self.handle_type
        );
    }
}

impl<T> HandleContainer<T> for MappedHandleContainer<T> {
    fn handle_type(&self) -> HandleType {
        self.handle_type
    }

    fn insert(&mut self, record: T) -> Result<Handle> {
        let id = self.next_id;
        self.next_id += 1;
        self.records.insert(id, record);
        Ok(Handle::new(self.handle_type, id))
    }

    fn get(&self, handle: Handle) -> &T {
        self.check_handle(handle);
        match self.records.get(&handle.id()) {
            Some(record) => record,
            None => panic!("no {:?} record for handle {}", self.handle_type, handle),
        }
    }

    fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.check_handle(handle);
        let handle_type = self.handle_type;
        match self.records.get_mut(&handle.id()) {
            Some(record) => record,
            None => panic!("no {:?} record for handle {}", handle_type, handle),
        }
    }

    fn try_get(&self, handle: Handle) -> Option<&T> {
        if handle.handle_type() != self.handle_type {
            return None;
        }
        self.records.get(&handle.id())
    }

    fn remove(&mut self, handle: Handle) -> Option<T> {
        self.check_handle(handle);
        self.records.remove(&handle.id())
    }

    fn handles(&self) -> Vec<Handle> {
        self.records.keys().map(|id| Handle::new(self.handle_type, *id)).collect()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
#[path = "mapped_handle_container_tests.rs"]
mod tests;
