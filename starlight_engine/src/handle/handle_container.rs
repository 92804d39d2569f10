/// HandleContainer trait - common interface of the handle-keyed arenas

use crate::error::Result;
use super::{Handle, HandleType};

/// Arena storage keyed by `Handle`
///
/// Owner-thread only: containers are not synchronized.
pub trait HandleContainer<T> {
    /// Category of handles issued by this container
    fn handle_type(&self) -> HandleType;

    /// Store a record and return its handle
    fn insert(&mut self, record: T) -> Result<Handle>;

    /// Borrow the record for `handle`
    ///
    /// # Panics
    ///
    /// Panics if the id is outside the container. The handle type is only
    /// checked by a debug assertion.
    fn get(&self, handle: Handle) -> &T;

    /// Mutably borrow the record for `handle` (same checks as `get`)
    fn get_mut(&mut self, handle: Handle) -> &mut T;

    /// Non-panicking lookup: None for a foreign handle type or unknown id
    fn try_get(&self, handle: Handle) -> Option<&T>;

    /// Remove the record and free its slot
    ///
    /// Returns None if the slot was not occupied.
    fn remove(&mut self, handle: Handle) -> Option<T>;

    /// Handles of all occupied slots
    fn handles(&self) -> Vec<Handle>;

    /// Number of occupied slots
    fn len(&self) -> usize;

    /// Whether no slot is occupied
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
