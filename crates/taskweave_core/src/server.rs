//! Named executors and runnable tasks.
//!
//! A [`TaskServer`] is the process-level entry point: it owns the executors
//! a deployment runs on and the node trees it knows how to run, both looked
//! up by name.
//!
//! # Example
//!
//! ```
//! use taskweave_core::server::TaskServer;
//! use taskweave_graph::prelude::*;
//!
//! let mut graph = Graph::new("pipeline");
//! graph.add_task("plan", task_fn(|_| TaskOutcome::success("planned")));
//!
//! let mut server = TaskServer::new();
//! server.add_executor(Executor::new("default", 2).unwrap());
//! server.add_task(graph);
//!
//! let ctx = ExecutionContext::new("problem");
//! server.run("pipeline", &ctx, "default").unwrap().wait();
//!
//! assert_eq!(ctx.last_record().unwrap().name(), "pipeline");
//! assert_eq!(server.available_tasks(), ["pipeline"]);
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use taskweave_graph::context::ExecutionContext;
use taskweave_graph::executor::Executor;
use taskweave_graph::future::TaskFuture;
use taskweave_graph::node::Node;

use crate::error::ServerError;

/// Registry of executors and tasks, iterated in insertion order.
///
/// Adding an entry under a name that is already taken replaces the earlier
/// entry.
#[derive(Debug, Default, Clone)]
pub struct TaskServer {
    executors: IndexMap<String, Executor>,
    tasks: IndexMap<String, Arc<Node>>,
}

impl TaskServer {
    /// Creates an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Executors
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers `executor` under its own name.
    pub fn add_executor(&mut self, executor: Executor) -> &mut Self {
        let name = executor.name().to_owned();
        if self.executors.insert(name.clone(), executor).is_some() {
            tracing::warn!(executor = %name, "replacing executor with the same name");
        }
        self
    }

    /// Returns the executor registered as `name`.
    #[must_use]
    pub fn get_executor(&self, name: &str) -> Option<&Executor> {
        self.executors.get(name)
    }

    /// Returns `true` if an executor is registered as `name`.
    #[must_use]
    pub fn has_executor(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    /// Executor names.
    #[must_use]
    pub fn available_executors(&self) -> Vec<&str> {
        self.executors.keys().map(String::as_str).collect()
    }

    /// Worker threads of the executor registered as `name`.
    ///
    /// # Errors
    ///
    /// [`ServerError::UnknownExecutor`] if there is none.
    pub fn worker_count(&self, name: &str) -> Result<usize, ServerError> {
        self.executor(name).map(Executor::worker_count)
    }

    /// Jobs currently executing on the executor registered as `name`.
    ///
    /// # Errors
    ///
    /// [`ServerError::UnknownExecutor`] if there is none.
    pub fn task_count(&self, name: &str) -> Result<usize, ServerError> {
        self.executor(name).map(Executor::active_task_count)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tasks
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers `task` under its node name.
    pub fn add_task(&mut self, task: impl Into<Node>) -> &mut Self {
        let task = task.into();
        let name = task.name().to_owned();
        if self.tasks.insert(name.clone(), Arc::new(task)).is_some() {
            tracing::warn!(task = %name, "replacing task with the same name");
        }
        self
    }

    /// Returns the task registered as `name`.
    #[must_use]
    pub fn get_task(&self, name: &str) -> Option<&Node> {
        self.tasks.get(name).map(AsRef::as_ref)
    }

    /// Returns `true` if a task is registered as `name`.
    #[must_use]
    pub fn has_task(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names.
    #[must_use]
    pub fn available_tasks(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Running
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs the registered task `task_name` on the executor `executor_name`.
    ///
    /// The same registered node can be run any number of times, on any
    /// number of contexts, concurrently.
    ///
    /// # Errors
    ///
    /// - [`ServerError::UnknownTask`] or [`ServerError::UnknownExecutor`] for
    ///   a name that is not registered
    /// - [`ServerError::Execution`] if the task is a graph that fails
    ///   validation
    pub fn run(
        &self,
        task_name: &str,
        ctx: &ExecutionContext,
        executor_name: &str,
    ) -> Result<TaskFuture, ServerError> {
        let task = self
            .tasks
            .get(task_name)
            .ok_or_else(|| ServerError::UnknownTask(task_name.to_owned()))?;
        self.run_node(Arc::clone(task), ctx, executor_name)
    }

    /// Runs a node that is not registered with the server.
    ///
    /// # Errors
    ///
    /// - [`ServerError::UnknownExecutor`] if `executor_name` is not registered
    /// - [`ServerError::Execution`] for a graph that fails validation
    pub fn run_node(
        &self,
        node: impl Into<Arc<Node>>,
        ctx: &ExecutionContext,
        executor_name: &str,
    ) -> Result<TaskFuture, ServerError> {
        let executor = self.executor(executor_name)?;
        let node = node.into();
        tracing::info!(
            task = %node.name(),
            executor = %executor_name,
            context = %ctx.name(),
            "dispatching task"
        );
        Ok(executor.run_node(node, ctx)?)
    }

    fn executor(&self, name: &str) -> Result<&Executor, ServerError> {
        self.executors
            .get(name)
            .ok_or_else(|| ServerError::UnknownExecutor(name.to_owned()))
    }
}
