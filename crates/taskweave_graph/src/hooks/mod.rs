//! Execution observers.
//!
//! Executors report progress as [`ExecutionEvent`]s delivered to the
//! [`Observers`] registry injected into the run's context. Use them for
//! progress displays, metrics or test assertions.
//!
//! - **Events** ([`events`]): the `ExecutionEvent` enum
//! - **API** ([`api`]): registration and delivery

pub mod api;
pub mod events;

pub use api::{ObserverError, Observers};
pub use events::{EventKind, ExecutionEvent};
