/// Handle - typed lookup token for resources stored in handle containers

use std::fmt;

/// Category of the record a handle refers to
///
/// A handle may only be looked up in a container registered for the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleType {
    Buffer,
    Texture,
    Shader,
    Pipeline,
    Material,
    Object,
    Task,
    Controller,
    /// Application-defined category
    Custom(u8),
}

/// Opaque `{type, id}` reference to a record owned by a container
///
/// Handles are plain values: they do not keep the record alive and are not
/// invalidated when the record is removed. A removed slot may later be handed
/// out again with the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    handle_type: HandleType,
    id: u32,
}

impl Handle {
    /// Create a handle (containers call this on insert)
    pub fn new(handle_type: HandleType, id: u32) -> Self {
        Self { handle_type, id }
    }

    /// Record category
    pub fn handle_type(&self) -> HandleType {
        self.handle_type
    }

    /// Slot id inside the owning container
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.handle_type, self.id)
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
