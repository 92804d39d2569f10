/// Semaphore trait

use std::any::Any;

/// GPU-GPU synchronization primitive
///
/// Signalled by a transfer submission and waited on by the graphics queue
/// before the uploaded resource is used. Semaphores are binary: a signal may
/// only be submitted while no earlier signal is left unwaited.
pub trait Semaphore: Send + Sync {
    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}
