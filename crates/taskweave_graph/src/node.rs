//! Node types for task graphs.
//!
//! A [`Node`] is either a leaf [`TaskNode`] wrapping one [`Task`], or a nested
//! [`Graph`] that schedules its own children. Both share a [`NodeInfo`]
//! header and the same execution contract: run against an
//! [`ExecutionContext`], append exactly one [`NodeRecord`], and report an
//! integer outcome.

use core::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use crate::context::{ExecutionContext, NodeRecord};
use crate::executor::Executor;
use crate::executor::run::execute_graph_node;
use crate::graph::Graph;
use crate::hooks::ExecutionEvent;
use crate::task::{Task, TaskContext, TaskOutcome};

/// Unique identifier for a node.
///
/// Ids are random 21-character tokens, unique within any realistic process
/// lifetime. Display prints the raw token so it can double as a data bus key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Arc<str>);

impl NodeId {
    /// Generates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::from(nanoid::nanoid!()))
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Header shared by every node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    id: NodeId,
    name: String,
    input_keys: Vec<String>,
    output_keys: Vec<String>,
    conditional: bool,
    abort_terminal: Option<i32>,
}

impl NodeInfo {
    /// Creates a header with a fresh id and no keys.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            input_keys: Vec::new(),
            output_keys: Vec::new(),
            conditional: false,
            abort_terminal: None,
        }
    }

    /// Returns the node id.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Returns the display name. Names need not be unique.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the node.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Ordered data bus keys the node reads.
    #[must_use]
    pub fn input_keys(&self) -> &[String] {
        &self.input_keys
    }

    /// Ordered data bus keys the node writes.
    #[must_use]
    pub fn output_keys(&self) -> &[String] {
        &self.output_keys
    }

    /// Replaces the input keys.
    pub fn set_input_keys(&mut self, keys: impl IntoIterator<Item = impl Into<String>>) {
        self.input_keys = keys.into_iter().map(Into::into).collect();
    }

    /// Replaces the output keys.
    pub fn set_output_keys(&mut self, keys: impl IntoIterator<Item = impl Into<String>>) {
        self.output_keys = keys.into_iter().map(Into::into).collect();
    }

    /// Whether the outcome selects among outgoing edge groups.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.conditional
    }

    /// Sets the conditional flag.
    pub fn set_conditional(&mut self, conditional: bool) {
        self.conditional = conditional;
    }

    /// Outcome on which this node raises the context abort flag, if any.
    #[must_use]
    pub fn abort_terminal(&self) -> Option<i32> {
        self.abort_terminal
    }

    /// Makes `outcome` abort the whole run when this node returns it.
    pub fn set_abort_terminal(&mut self, outcome: Option<i32>) {
        self.abort_terminal = outcome;
    }

    /// Applies a remapping table to the input keys. Unlisted keys are kept.
    pub fn rename_input_keys<K, V>(&mut self, mapping: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        rename_keys(&mut self.input_keys, mapping);
    }

    /// Applies a remapping table to the output keys. Unlisted keys are kept.
    pub fn rename_output_keys<K, V>(&mut self, mapping: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        rename_keys(&mut self.output_keys, mapping);
    }

    /// Appends `index` to every input key listed in `keys`.
    pub fn index_input_keys(&mut self, keys: &[impl AsRef<str>], index: usize) {
        index_keys(&mut self.input_keys, keys, index);
    }

    /// Appends `index` to every output key listed in `keys`.
    pub fn index_output_keys(&mut self, keys: &[impl AsRef<str>], index: usize) {
        index_keys(&mut self.output_keys, keys, index);
    }

    pub(crate) fn regenerate_id(&mut self) {
        self.id = NodeId::new();
    }
}

fn rename_keys<K, V>(keys: &mut [String], mapping: impl IntoIterator<Item = (K, V)>)
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    // Resolve against the original names so chained entries do not cascade.
    let mapping: Vec<(K, V)> = mapping.into_iter().collect();
    for key in keys.iter_mut() {
        if let Some((_, to)) = mapping.iter().find(|(from, _)| from.as_ref() == key.as_str()) {
            *key = to.as_ref().to_owned();
        }
    }
}

fn owned_pairs<K, V>(mapping: impl IntoIterator<Item = (K, V)>) -> Vec<(String, String)>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    mapping
        .into_iter()
        .map(|(from, to)| (from.as_ref().to_owned(), to.as_ref().to_owned()))
        .collect()
}

fn index_keys(keys: &mut [String], selected: &[impl AsRef<str>], index: usize) {
    for key in keys.iter_mut() {
        if selected.iter().any(|s| s.as_ref() == key.as_str()) {
            key.push_str(&index.to_string());
        }
    }
}

/// Discriminant of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A leaf task.
    Task,
    /// A nested graph.
    Graph,
}

/// A schedulable unit of work.
#[derive(Debug, Clone)]
pub enum Node {
    /// Runs one [`Task`].
    Task(TaskNode),
    /// Runs a nested [`Graph`] to completion.
    Graph(Arc<Graph>),
}

pub(crate) struct Execution {
    pub(crate) record: NodeRecord,
    pub(crate) aborted: bool,
}

impl Node {
    /// Returns the node header.
    #[must_use]
    pub fn info(&self) -> &NodeInfo {
        match self {
            Node::Task(task) => &task.info,
            Node::Graph(graph) => graph.info(),
        }
    }

    /// Returns the mutable node header.
    ///
    /// A shared nested graph is copied first.
    pub fn info_mut(&mut self) -> &mut NodeInfo {
        match self {
            Node::Task(task) => &mut task.info,
            Node::Graph(graph) => Arc::make_mut(graph).info_mut(),
        }
    }

    /// Returns the node id.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        self.info().id()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.info().name()
    }

    /// Returns the node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Task(_) => NodeKind::Task,
            Node::Graph(_) => NodeKind::Graph,
        }
    }

    /// Applies a remapping table to the input keys.
    ///
    /// A graph applies the same table to every nested child, so children
    /// keep reading the keys the graph exposes.
    pub fn rename_input_keys<K, V>(&mut self, mapping: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mapping = owned_pairs(mapping);
        self.update_headers(&mut |info| {
            info.rename_input_keys(mapping.iter().map(|(from, to)| (from, to)));
        });
    }

    /// Applies a remapping table to the output keys, recursively for graphs.
    pub fn rename_output_keys<K, V>(&mut self, mapping: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mapping = owned_pairs(mapping);
        self.update_headers(&mut |info| {
            info.rename_output_keys(mapping.iter().map(|(from, to)| (from, to)));
        });
    }

    /// Appends `index` to every listed input key, recursively for graphs.
    pub fn index_input_keys(&mut self, keys: &[impl AsRef<str>], index: usize) {
        self.update_headers(&mut |info| info.index_input_keys(keys, index));
    }

    /// Appends `index` to every listed output key, recursively for graphs.
    pub fn index_output_keys(&mut self, keys: &[impl AsRef<str>], index: usize) {
        self.update_headers(&mut |info| info.index_output_keys(keys, index));
    }

    /// This node's header followed by every nested header, depth first.
    #[must_use]
    pub fn headers(&self) -> Vec<&NodeInfo> {
        let mut headers = vec![self.info()];
        if let Node::Graph(graph) = self {
            for child in graph.nodes() {
                headers.extend(child.headers());
            }
        }
        headers
    }

    fn update_headers(&mut self, update: &mut dyn FnMut(&mut NodeInfo)) {
        match self {
            Node::Task(task) => update(&mut task.info),
            Node::Graph(graph) => {
                let graph = Arc::make_mut(graph);
                update(graph.info_mut());
                for child in graph.nodes_mut() {
                    child.update_headers(update);
                }
            }
        }
    }

    /// Returns a copy with a fresh id, for stamping out template instances.
    #[must_use]
    pub fn instantiate(&self) -> Node {
        let mut node = self.clone();
        node.info_mut().regenerate_id();
        node
    }

    /// Runs the node, appends its record to `ctx` and returns a copy of it.
    ///
    /// If `ctx` is already aborted the node's work is skipped and the record
    /// carries outcome `0` with the message `"Aborted"`. Nested graphs need
    /// `executor`; without one they fail immediately.
    pub fn execute(&self, ctx: &ExecutionContext, executor: Option<&Executor>) -> NodeRecord {
        self.run(ctx, executor).record
    }

    pub(crate) fn run(&self, ctx: &ExecutionContext, executor: Option<&Executor>) -> Execution {
        if ctx.is_aborted() {
            return Execution {
                record: self.record_aborted(ctx),
                aborted: true,
            };
        }

        let info = self.info();
        ctx.notify(&ExecutionEvent::NodeStarted {
            node_id: info.id().clone(),
            name: info.name().to_owned(),
        });

        let start = Instant::now();
        let outcome = match self {
            Node::Task(task) => task.invoke(ctx, executor),
            Node::Graph(graph) => execute_graph_node(graph, ctx, executor),
        };
        let elapsed = start.elapsed();

        if info.abort_terminal() == Some(outcome.outcome) {
            ctx.abort();
        }

        tracing::debug!(
            node = %info.name(),
            outcome = outcome.outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "node complete"
        );

        let record = NodeRecord::new(info, outcome.outcome, outcome.message, elapsed, ctx);
        ctx.append(record.clone());
        ctx.notify(&ExecutionEvent::NodeCompleted {
            node_id: info.id().clone(),
            name: info.name().to_owned(),
            outcome: record.outcome(),
            duration: elapsed,
        });

        Execution {
            record,
            aborted: false,
        }
    }

    pub(crate) fn record_aborted(&self, ctx: &ExecutionContext) -> NodeRecord {
        let info = self.info();
        let record = NodeRecord::aborted(info, ctx);
        ctx.append(record.clone());
        ctx.notify(&ExecutionEvent::NodeAborted {
            node_id: info.id().clone(),
            name: info.name().to_owned(),
        });
        record
    }
}

impl From<TaskNode> for Node {
    fn from(value: TaskNode) -> Self {
        Node::Task(value)
    }
}

impl From<Graph> for Node {
    fn from(value: Graph) -> Self {
        Node::Graph(Arc::new(value))
    }
}

impl From<Arc<Graph>> for Node {
    fn from(value: Arc<Graph>) -> Self {
        Node::Graph(value)
    }
}

/// A leaf node wrapping one [`Task`].
#[derive(Clone)]
pub struct TaskNode {
    info: NodeInfo,
    task: Arc<dyn Task>,
}

impl TaskNode {
    /// Creates an unconditional task node with no keys.
    #[must_use]
    pub fn new(name: impl Into<String>, task: impl Task) -> Self {
        Self {
            info: NodeInfo::new(name),
            task: Arc::new(task),
        }
    }

    /// Creates a task node from an already shared task.
    #[must_use]
    pub fn from_arc(name: impl Into<String>, task: Arc<dyn Task>) -> Self {
        Self {
            info: NodeInfo::new(name),
            task,
        }
    }

    /// Sets the input keys.
    #[must_use]
    pub fn with_inputs(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.info.set_input_keys(keys);
        self
    }

    /// Sets the output keys.
    #[must_use]
    pub fn with_outputs(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.info.set_output_keys(keys);
        self
    }

    /// Marks the node conditional.
    #[must_use]
    pub fn conditional(mut self, conditional: bool) -> Self {
        self.info.set_conditional(conditional);
        self
    }

    /// Aborts the run when the task returns `outcome`.
    #[must_use]
    pub fn with_abort_terminal(mut self, outcome: i32) -> Self {
        self.info.set_abort_terminal(Some(outcome));
        self
    }

    /// Returns the node header.
    #[must_use]
    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    /// Returns the mutable node header.
    pub fn info_mut(&mut self) -> &mut NodeInfo {
        &mut self.info
    }

    /// Returns the wrapped task.
    #[must_use]
    pub fn task(&self) -> &Arc<dyn Task> {
        &self.task
    }

    fn invoke(&self, ctx: &ExecutionContext, executor: Option<&Executor>) -> TaskOutcome {
        let cx = TaskContext::new(&self.info, ctx, executor);
        match catch_unwind(AssertUnwindSafe(|| self.task.run(&cx))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_owned());
                tracing::error!(node = %self.info.name(), %reason, "task panicked");
                TaskOutcome::failure(format!("panicked: {reason}"))
            }
        }
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", self.info.id())
            .field("name", &self.info.name())
            .field("conditional", &self.info.is_conditional())
            .finish_non_exhaustive()
    }
}
