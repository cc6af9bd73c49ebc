//! Node templates, built-in tasks and the raster pipeline for taskweave
//! (Layer 3).
//!
//! # Core Concepts
//!
//! - [`TemplateRegistry`] - Named factories that stamp out configured nodes
//! - [`TemplateConfig`] - Key remapping and indexing applied to one instance
//! - [`RasterMotionTask`] - Expands a raster program into a sub-graph at run
//!   time and plans every segment concurrently
//! - [`tasks`] - Small built-in tasks: start, input checks and the merge
//!   tasks that stitch segment boundaries together
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use taskweave_graph::node::TaskNode;
//! use taskweave_graph::task::{TaskOutcome, task_fn};
//! use taskweave_nodes::prelude::*;
//!
//! let mut registry = TemplateRegistry::new();
//! registry.register("Pass", |name| {
//!     TaskNode::new(name, task_fn(|_| TaskOutcome::success("planned")))
//!         .with_inputs(["input_data"])
//!         .with_outputs(["output_data"])
//!         .into()
//! });
//!
//! let section = |prefix: &str| {
//!     let (input, output) = (format!("{prefix}_input"), format!("{prefix}_output"));
//!     TemplateConfig::new("Pass")
//!         .remap_input("input_data", &input)
//!         .remap_output("output_data", &output)
//!         .index_inputs([input])
//!         .index_outputs([output])
//! };
//! let config = RasterConfig {
//!     freespace: section("freespace"),
//!     raster: section("raster"),
//!     transition: section("transition"),
//! };
//!
//! let task = RasterMotionTask::new(
//!     "raster",
//!     "program",
//!     "planned",
//!     true,
//!     config,
//!     Arc::new(registry),
//! );
//! assert!(task.is_ok());
//! ```
//!
//! # Architecture
//!
//! - **Layer 1** (`taskweave_data`): data bus and payload model
//! - **Layer 2** (`taskweave_graph`): scheduling primitives
//! - **Layer 3** (`taskweave_nodes`): templates and built-in tasks (this crate)

/// Template configuration.
pub mod config;

/// Construction and planning errors.
pub mod error;

/// Dynamic raster sub-graph builder.
pub mod raster;

/// Named node templates.
pub mod registry;

/// Built-in tasks.
pub mod tasks;

pub use config::{RasterConfig, TemplateConfig};
pub use error::{ConfigError, RasterError};
pub use raster::{RasterMotionTask, RasterPlan};
pub use registry::{TemplateFactory, TemplateInstance, TemplateRegistry};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::config::{RasterConfig, TemplateConfig};
    pub use crate::error::{ConfigError, RasterError};
    pub use crate::raster::{RasterMotionTask, RasterPlan, SUBGRAPH_FAILED};
    pub use crate::registry::{TemplateFactory, TemplateInstance, TemplateRegistry};
    pub use crate::tasks::{
        CheckInputTask, SUCCESSFUL, StartTask, UpdateEndStateTask, UpdateStartAndEndStateTask,
        UpdateStartStateTask,
    };
}
