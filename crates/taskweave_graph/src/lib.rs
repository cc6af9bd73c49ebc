//! DAG scheduling primitives for taskweave (Layer 2).
//!
//! `taskweave_graph` runs directed acyclic graphs of nodes on a bounded worker
//! pool. The outcome each node reports decides which edges fire, and artifacts
//! travel between nodes through the context's data bus.
//!
//! # Core Concepts
//!
//! - [`Node`] - A schedulable unit: a [`TaskNode`] or a nested [`Graph`]
//! - [`Task`] - The payload interface domain logic implements
//! - [`Graph`] - Child nodes plus an outcome-keyed [`EdgeTable`]
//! - [`ExecutionContext`] - Per-run bus, abort flag, environment and audit trail
//! - [`Executor`] - Worker pool that schedules graphs and tasks
//! - [`TaskFuture`] - Completion handle returned by every run
//!
//! # Example
//!
//! ```
//! use taskweave_graph::prelude::*;
//!
//! let mut graph = Graph::new("check");
//! let check = graph.add_conditional_task(
//!     "has-input",
//!     task_fn(|cx| {
//!         if cx.data().contains("input") {
//!             TaskOutcome::success("found")
//!         } else {
//!             TaskOutcome::failure("missing")
//!         }
//!     }),
//! );
//! let missing = graph.add_task("report", task_fn(|_| TaskOutcome::success("reported")));
//! let present = graph.add_task("process", task_fn(|_| TaskOutcome::success("processed")));
//! graph.add_conditional_edges(&check, &[missing, present.clone()]);
//!
//! let ctx = ExecutionContext::new("example");
//! ctx.data().set("input", serde_json::json!(42));
//!
//! let executor = Executor::new("example", 2).unwrap();
//! executor.run_graph(graph, &ctx).unwrap().wait();
//!
//! let records = ctx.records();
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1].node_id(), &present);
//! ```
//!
//! # Architecture
//!
//! - **Layer 1** (`taskweave_data`): data bus and payload model
//! - **Layer 2** (`taskweave_graph`): scheduling primitives (this crate)
//! - **Layer 3** (`taskweave_nodes`, `taskweave_core`): built-in tasks,
//!   template registry, task server

/// Per-run shared state and audit records.
pub mod context;

/// Outcome-keyed edge table.
pub mod edge;

/// Worker pool and scheduler.
pub mod executor;

/// Completion handles.
pub mod future;

/// Graph structure and builder API.
pub mod graph;

/// Execution observers.
pub mod hooks;

/// Node types.
pub mod node;

/// The payload interface.
pub mod task;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::context::{
        ABORTED_MESSAGE, ContextBuilder, Environment, ExecutionContext, NodeRecord,
    };
    pub use crate::edge::EdgeTable;
    pub use crate::executor::{ExecutionError, Executor, ExecutorBuilder};
    pub use crate::future::{FutureStatus, TaskFuture};
    pub use crate::graph::{Graph, ValidationError};
    pub use crate::hooks::{EventKind, ExecutionEvent, ObserverError, Observers};
    pub use crate::node::{Node, NodeId, NodeInfo, NodeKind, TaskNode};
    pub use crate::task::{FAILURE, FnTask, SUCCESS, Task, TaskContext, TaskOutcome, task_fn};
}

pub use context::{Environment, ExecutionContext, NodeRecord};
pub use edge::EdgeTable;
pub use executor::{ExecutionError, Executor};
pub use future::{FutureStatus, TaskFuture};
pub use graph::{Graph, ValidationError};
pub use node::{Node, NodeId, NodeInfo, NodeKind, TaskNode};
pub use task::{Task, TaskContext, TaskOutcome};
