//! The payload interface.
//!
//! A [`Task`] is the only hook domain logic implements. It reads and writes
//! keyed entries through the [`TaskContext`] and reports a [`TaskOutcome`].
//! Failures are values, not errors: a task that cannot do its job returns
//! outcome [`FAILURE`] with a message.

use crate::context::{Environment, ExecutionContext};
use crate::executor::Executor;
use crate::node::NodeInfo;
use taskweave_data::DataBus;

/// Outcome for failure, not-found or invalid input.
pub const FAILURE: i32 = 0;

/// Canonical success outcome.
pub const SUCCESS: i32 = 1;

/// Result of one task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Integer outcome. `0` is failure, anything else success.
    pub outcome: i32,
    /// Human-readable message stored in the node record.
    pub message: String,
}

impl TaskOutcome {
    /// Creates an outcome with an explicit value.
    pub fn new(outcome: i32, message: impl Into<String>) -> Self {
        Self {
            outcome,
            message: message.into(),
        }
    }

    /// Outcome [`SUCCESS`].
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(SUCCESS, message)
    }

    /// Outcome [`FAILURE`].
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(FAILURE, message)
    }

    /// Returns `true` for any nonzero outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome != FAILURE
    }
}

/// What a task sees while it runs.
pub struct TaskContext<'a> {
    info: &'a NodeInfo,
    ctx: &'a ExecutionContext,
    executor: Option<&'a Executor>,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(
        info: &'a NodeInfo,
        ctx: &'a ExecutionContext,
        executor: Option<&'a Executor>,
    ) -> Self {
        Self { info, ctx, executor }
    }

    /// Header of the node being run.
    #[must_use]
    pub fn node(&self) -> &'a NodeInfo {
        self.info
    }

    /// The run's execution context.
    #[must_use]
    pub fn context(&self) -> &'a ExecutionContext {
        self.ctx
    }

    /// Shortcut for the run's data bus.
    #[must_use]
    pub fn data(&self) -> &'a DataBus {
        self.ctx.data()
    }

    /// Shortcut for the run's read-only environment.
    #[must_use]
    pub fn environment(&self) -> &'a Environment {
        self.ctx.environment()
    }

    /// The executor running this task, for tasks that build sub-graphs.
    #[must_use]
    pub fn executor(&self) -> Option<&'a Executor> {
        self.executor
    }

    /// The `index`-th input key.
    #[must_use]
    pub fn input_key(&self, index: usize) -> Option<&'a str> {
        self.info.input_keys().get(index).map(String::as_str)
    }

    /// The `index`-th output key.
    #[must_use]
    pub fn output_key(&self, index: usize) -> Option<&'a str> {
        self.info.output_keys().get(index).map(String::as_str)
    }
}

/// A unit of domain work.
pub trait Task: Send + Sync + 'static {
    /// Performs the work.
    fn run(&self, cx: &TaskContext<'_>) -> TaskOutcome;
}

/// A [`Task`] backed by a closure. Build one with [`task_fn`].
#[derive(Clone)]
pub struct FnTask<F>(F);

impl<F> Task for FnTask<F>
where
    F: Fn(&TaskContext<'_>) -> TaskOutcome + Send + Sync + 'static,
{
    fn run(&self, cx: &TaskContext<'_>) -> TaskOutcome {
        (self.0)(cx)
    }
}

/// Wraps a closure as a [`Task`].
///
/// # Example
///
/// ```
/// use taskweave_graph::task::{TaskOutcome, task_fn};
/// use taskweave_graph::node::TaskNode;
///
/// let node = TaskNode::new(
///     "copy",
///     task_fn(|cx| {
///         let (Some(from), Some(to)) = (cx.input_key(0), cx.output_key(0)) else {
///             return TaskOutcome::failure("copy needs one input and one output key");
///         };
///         match cx.data().get(from) {
///             Some(value) => {
///                 cx.data().set(to, value);
///                 TaskOutcome::success("copied")
///             }
///             None => TaskOutcome::failure(format!("missing input '{from}'")),
///         }
///     }),
/// )
/// .with_inputs(["in"])
/// .with_outputs(["out"]);
/// # let _ = node;
/// ```
pub fn task_fn<F>(f: F) -> FnTask<F>
where
    F: Fn(&TaskContext<'_>) -> TaskOutcome + Send + Sync + 'static,
{
    FnTask(f)
}
