/// Allocates and recycles unique `u32` slot ids below a fixed capacity.
///
/// Backs the id policy of `LinearHandleContainer`: freed ids go on a stack
/// and are handed out again before any fresh id. Fresh ids grow from 0 up to
/// `capacity`; past that, allocation fails.
///
/// # Example
///
/// ```ignore
/// let mut alloc = SlotAllocator::new(2);
/// let a = alloc.alloc();  // Some(0)
/// let b = alloc.alloc();  // Some(1)
/// alloc.alloc();          // None (full)
/// alloc.free(0);
/// let c = alloc.alloc();  // Some(0) (recycled)
/// ```
pub struct SlotAllocator {
    free_list: Vec<u32>,
    next_space: u32,
    capacity: u32,
    len: u32,
}

impl SlotAllocator {
    /// Create a new empty allocator handing out ids in `0..capacity`
    pub fn new(capacity: u32) -> Self {
        Self {
            free_list: Vec::new(),
            next_space: 0,
            capacity,
            len: 0,
        }
    }

    /// Allocate the next available slot id, or None when every id is in use
    pub fn alloc(&mut self) -> Option<u32> {
        let id = match self.free_list.pop() {
            Some(id) => id,
            None if self.next_space < self.capacity => {
                let id = self.next_space;
                self.next_space += 1;
                id
            }
            None => return None,
        };
        self.len += 1;
        Some(id)
    }

    /// Return a slot id to the pool for reuse
    pub fn free(&mut self, id: u32) {
        debug_assert!(id < self.next_space, "freeing an unallocated slot: {}", id);
        self.len -= 1;
        self.free_list.push(id);
    }

    /// Highest id ever allocated + 1
    pub fn high_water_mark(&self) -> u32 {
        self.next_space
    }

    /// Maximum number of simultaneously allocated ids
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of currently allocated slots
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no slots are currently allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
