//! # taskweave Internal Library
//!
//! Re-exports the core taskweave crates for convenience.

/// Layer 1: Data bus and payload model.
pub use taskweave_data;

/// Layer 2: DAG scheduling primitives.
pub use taskweave_graph;

/// Layer 3: Templates, built-in tasks and the raster pipeline.
pub use taskweave_nodes;

/// Layer 3: Task server and tracing setup.
pub use taskweave_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use taskweave_core::prelude::*;
    pub use taskweave_data::prelude::*;
    pub use taskweave_graph::prelude::*;
    pub use taskweave_nodes::prelude::*;
}
