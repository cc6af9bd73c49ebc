//! Task server and tracing setup for taskweave (Layer 3).
//!
//! - [`TaskServer`] - Named executors and named runnable tasks
//! - [`TracingConfig`] - Installs the global `tracing` subscriber for binaries
//!
//! # Architecture
//!
//! - **Layer 1** (`taskweave_data`): data bus and payload model
//! - **Layer 2** (`taskweave_graph`): scheduling primitives
//! - **Layer 3** (`taskweave_nodes`, `taskweave_core`): built-in tasks,
//!   templates, task server (this crate)

/// Server and tracing setup errors.
pub mod error;

/// Named executors and runnable tasks.
pub mod server;

/// Global subscriber setup.
pub mod tracing_setup;

pub use error::{ServerError, TracingInitError};
pub use server::TaskServer;
pub use tracing_setup::{TracingConfig, TracingFormat};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::error::{ServerError, TracingInitError};
    pub use crate::server::TaskServer;
    pub use crate::tracing_setup::{TracingConfig, TracingFormat};
}
