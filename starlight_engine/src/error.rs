//! Error types for the Starlight engine
//!
//! This module defines the error types used throughout the engine,
//! covering GPU resource creation, handle storage and task construction.

use std::fmt;

/// Result type for Starlight engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Starlight engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan call failure, lost device, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (zero-sized buffer, unsupported texture, etc.)
    InvalidResource(String),

    /// Initialization failed (transfer queues, worker threads)
    InitializationFailed(String),

    /// A fixed-capacity container has no free slot left
    CapacityExhausted { capacity: usize },

    /// Task or complete task built without a required field
    InvalidTask(String),

    /// Payload does not fit in the inline task storage
    PayloadTooLarge { size: usize, align: usize, capacity: usize, max_align: usize },

    /// A worker or transfer thread is not running anymore
    WorkerStopped(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::CapacityExhausted { capacity } => {
                write!(f, "Storage full: all {} slots are in use", capacity)
            }
            Error::InvalidTask(msg) => write!(f, "Invalid task: {}", msg),
            Error::PayloadTooLarge { size, align, capacity, max_align } => write!(
                f,
                "Payload too large: {} bytes (align {}) does not fit in {} bytes (align {})",
                size, align, capacity, max_align
            ),
            Error::WorkerStopped(msg) => write!(f, "Worker stopped: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
