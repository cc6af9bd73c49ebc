//! Graph execution engine.
//!
//! An [`Executor`] owns a bounded pool of worker threads and runs graphs or
//! single tasks on it. Every run returns a [`TaskFuture`].
//!
//! # Scheduling
//!
//! A child becomes ready once every distinct predecessor has resolved and at
//! least one of them routed into it. Sources are ready immediately:
//!
//! - a conditional predecessor routes along the edge group keyed by its outcome
//! - a non-conditional predecessor routes along all of its edges
//! - a child whose predecessors all resolved without routing into it is pruned
//!   and never recorded
//!
//! Before running, each node checks the abort flag. Once it is set, every node
//! that has not started yet is recorded with outcome `0` and the message
//! `"Aborted"`, and an aborted predecessor forces its successors to abort too,
//! so the run still drains.
//!
//! With a single worker, nodes run one at a time in a fixed order derived
//! from insertion order.
//!
//! # Example
//!
//! ```
//! use taskweave_graph::context::ExecutionContext;
//! use taskweave_graph::executor::Executor;
//! use taskweave_graph::graph::Graph;
//! use taskweave_graph::task::{TaskOutcome, task_fn};
//!
//! let mut graph = Graph::new("hello");
//! let a = graph.add_task("a", task_fn(|_| TaskOutcome::success("a")));
//! let b = graph.add_task("b", task_fn(|_| TaskOutcome::success("b")));
//! graph.add_edge(&a, &b);
//!
//! let executor = Executor::new("docs", 2).unwrap();
//! let ctx = ExecutionContext::new("problem");
//! executor.run_graph(graph, &ctx).unwrap().wait();
//!
//! assert_eq!(ctx.records().len(), 2);
//! ```

pub(crate) mod pool;
pub(crate) mod run;

use core::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::context::ExecutionContext;
use crate::future::{Completion, TaskFuture};
use crate::graph::{Graph, ValidationError};
use crate::node::{Node, TaskNode};
use pool::{Job, Pool, worker_loop};
use run::GraphRun;

/// Errors raised before a run is scheduled.
#[derive(Debug, Clone)]
pub enum ExecutionError {
    /// The graph failed validation; nothing was scheduled.
    InvalidGraph(Vec<ValidationError>),
    /// A worker thread could not be spawned.
    WorkerSpawn(String),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::InvalidGraph(errors) => {
                write!(f, "invalid graph")?;
                for (i, error) in errors.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{sep}{error}")?;
                }
                Ok(())
            }
            ExecutionError::WorkerSpawn(reason) => {
                write!(f, "failed to spawn worker thread: {reason}")
            }
        }
    }
}

impl core::error::Error for ExecutionError {}

struct ExecutorInner {
    name: String,
    worker_count: usize,
    pool: Arc<Pool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for ExecutorInner {
    fn drop(&mut self) {
        self.pool.shutdown();
        // The last handle may be released by a job on a worker thread.
        let current = thread::current().id();
        for handle in self.workers.get_mut().drain(..) {
            if handle.thread().id() != current && handle.join().is_err() {
                tracing::error!(executor = %self.name, "worker thread panicked");
            }
        }
    }
}

/// Runs graphs and tasks on a bounded worker pool.
///
/// Cloning is cheap and every clone drives the same pool. The workers shut
/// down once the last clone is dropped and queued jobs have drained.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

impl Executor {
    /// Creates an executor with `worker_count` threads (at least one).
    ///
    /// # Errors
    ///
    /// [`ExecutionError::WorkerSpawn`] if the OS refuses a thread.
    pub fn new(name: impl Into<String>, worker_count: usize) -> Result<Self, ExecutionError> {
        Self::builder().name(name).workers(worker_count).build()
    }

    /// Creates an executor with one worker per available CPU.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::WorkerSpawn`] if the OS refuses a thread.
    pub fn with_default_workers(name: impl Into<String>) -> Result<Self, ExecutionError> {
        Self::builder().name(name).build()
    }

    /// Starts configuring an executor.
    #[must_use]
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    /// Executor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.inner.worker_count
    }

    /// Number of jobs currently executing on this executor's threads.
    #[must_use]
    pub fn active_task_count(&self) -> usize {
        self.inner.pool.active()
    }

    /// Validates and schedules `graph`.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::InvalidGraph`] if validation fails, in which case
    /// nothing runs.
    pub fn run_graph(
        &self,
        graph: impl Into<Arc<Graph>>,
        ctx: &ExecutionContext,
    ) -> Result<TaskFuture, ExecutionError> {
        let graph = graph.into();
        graph.validate().map_err(ExecutionError::InvalidGraph)?;
        Ok(GraphRun::launch(graph, ctx, self).future())
    }

    /// Schedules a single task outside any graph.
    ///
    /// The task's record is appended to `ctx` like any other node's.
    pub fn run_task(&self, task: TaskNode, ctx: &ExecutionContext) -> TaskFuture {
        self.spawn_node(Arc::new(Node::Task(task)), ctx)
    }

    /// Schedules any node as a single unit.
    ///
    /// A graph node appends its children's records followed by its own,
    /// whose outcome follows the graph's terminals.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::InvalidGraph`] for a graph that fails validation.
    pub fn run_node(
        &self,
        node: impl Into<Arc<Node>>,
        ctx: &ExecutionContext,
    ) -> Result<TaskFuture, ExecutionError> {
        let node = node.into();
        if let Node::Graph(graph) = node.as_ref() {
            graph.validate().map_err(ExecutionError::InvalidGraph)?;
        }
        Ok(self.spawn_node(node, ctx))
    }

    fn spawn_node(&self, node: Arc<Node>, ctx: &ExecutionContext) -> TaskFuture {
        let completion = Completion::new(self.pool());
        let retained: Arc<dyn core::any::Any + Send + Sync> = Arc::<Node>::clone(&node);
        let future = TaskFuture::new(Arc::clone(&completion), retained);
        let executor = self.clone();
        let ctx = ctx.clone();
        self.submit(Box::new(move || {
            node.execute(&ctx, Some(&executor));
            completion.complete();
        }));
        future
    }

    pub(crate) fn submit(&self, job: Job) {
        self.inner.pool.submit(job);
    }

    pub(crate) fn pool(&self) -> Arc<Pool> {
        Arc::clone(&self.inner.pool)
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("name", &self.inner.name)
            .field("worker_count", &self.inner.worker_count)
            .field("active", &self.active_task_count())
            .finish()
    }
}

/// Builder for [`Executor`].
#[derive(Debug, Clone, Default)]
pub struct ExecutorBuilder {
    name: Option<String>,
    workers: Option<usize>,
}

impl ExecutorBuilder {
    /// Default executor name.
    pub const DEFAULT_NAME: &'static str = "default";

    /// Sets the executor name, used for thread names and server lookup.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the worker count. Zero is raised to one.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Spawns the workers.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::WorkerSpawn`] if the OS refuses a thread. Workers
    /// spawned before the failure are shut down.
    pub fn build(self) -> Result<Executor, ExecutionError> {
        let name = self.name.unwrap_or_else(|| Self::DEFAULT_NAME.to_owned());
        let worker_count = self
            .workers
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, usize::from))
            .max(1);

        let pool = Pool::new();
        let inner = ExecutorInner {
            name,
            worker_count,
            pool: Arc::clone(&pool),
            workers: Mutex::new(Vec::with_capacity(worker_count)),
        };

        for index in 0..worker_count {
            let pool = Arc::clone(&pool);
            let handle = thread::Builder::new()
                .name(format!("{}-worker-{index}", inner.name))
                .spawn(move || worker_loop(pool))
                .map_err(|err| ExecutionError::WorkerSpawn(err.to_string()))?;
            inner.workers.lock().push(handle);
        }

        tracing::debug!(executor = %inner.name, workers = worker_count, "executor started");
        Ok(Executor {
            inner: Arc::new(inner),
        })
    }
}
