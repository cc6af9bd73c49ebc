//! Outcome-routed DAG task scheduling in Rust.
//!
//! Nodes are tasks or nested graphs. The integer outcome each task reports
//! picks which edges fire, artifacts travel through a shared data bus, and
//! every run executes on a bounded worker pool and hands back a future.

pub use taskweave_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use taskweave_internal::prelude::*;
}
