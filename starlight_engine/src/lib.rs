/*!
# Starlight Engine

Asynchronous GPU transfer and task-scheduling core of the Starlight renderer.

This crate is platform-agnostic: GPU access goes through the traits of the
`device` module, implemented by backends such as
`starlight_engine_renderer_vulkan`.

## Architecture

- **Handles**: typed `{type, id}` tokens and the containers that own records
- **Tasks**: fixed-size type-erased `Task`s run on `Worker` threads, with
  `CompleteTask` messages handed back to the owning thread
- **TaskManager**: worker pools per task kind, frame-deferred scheduling
- **TransferWorker**: background threads uploading buffers and textures
  through staging buffers, one per transfer queue
- **RenderResourceManager**: per-frame-in-flight buffers refreshed from controllers
- **DeviceContext**: the once-per-frame driver tying everything together
*/

// Internal modules
mod error;
mod engine;
mod utils;
mod device_context;
pub mod log;
pub mod handle;
pub mod task;
pub mod device;
pub mod transfer;
pub mod render;

// Main starlight namespace module
pub mod starlight {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine-wide logger access
    pub use crate::engine::Engine;

    // Frame driver
    pub use crate::device_context::{DeviceContext, DeviceContextConfig, FrameReport};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Handles and handle containers
    pub mod handle {
        pub use crate::handle::*;
    }

    // Tasks, workers and the task manager
    pub mod task {
        pub use crate::task::*;
    }

    // GPU abstraction implemented by backends
    pub mod device {
        pub use crate::device::*;
    }

    // Asynchronous uploads
    pub mod transfer {
        pub use crate::transfer::*;
    }

    // Render resources
    pub mod render {
        pub use crate::render::*;
    }
}
