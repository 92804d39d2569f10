//! Render resources fed by the transfer threads

mod buffer_controller;
mod render_resource_manager;

pub use buffer_controller::{BufferController, DataBufferController, DirtyFrames};
pub use render_resource_manager::{BufferRecord, RenderResourceManager};
