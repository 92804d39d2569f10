//! Asynchronous GPU uploads
//!
//! The owning thread queues transfer requests on a `TransferWorker`; transfer
//! threads record and submit the copies and publish the resulting resources
//! in `TransferSlot`s.

mod transfer_slot;
mod transfer_request;
mod transfer_manager_thread;
mod transfer_worker;

pub use transfer_slot::{BufferSlot, TextureSlot, TransferSlot, TransferStatus};
pub use transfer_request::{BufferData, BufferTransferRequest, TextureData, TextureTransferRequest};
pub use transfer_worker::{TransferConfig, TransferWorker};
