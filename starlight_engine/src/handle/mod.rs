//! Handles and handle containers
//!
//! Resources are referenced through small copyable `Handle` tokens instead of
//! pointers. Containers own the records and hand out handles on insert.

mod handle;
mod handle_container;
mod linear_handle_container;
mod mapped_handle_container;
mod managed_handle_container;

pub use handle::{Handle, HandleType};
pub use handle_container::HandleContainer;
pub use linear_handle_container::LinearHandleContainer;
pub use mapped_handle_container::MappedHandleContainer;
pub use managed_handle_container::{Cleanup, ManagedHandleContainer};
