//! Per-run shared state.
//!
//! An [`ExecutionContext`] is created by the caller, handed to an executor and
//! inspected afterwards. It bundles four things every node of a run can see:
//!
//! - the [`DataBus`] artifacts travel through
//! - a monotonic abort flag
//! - the read-only [`Environment`]
//! - the append-only audit trail of [`NodeRecord`]s
//!
//! Observers are injected here too, so execution events reach whoever built
//! the context without any process-wide state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use hashbrown::HashMap;
use parking_lot::Mutex;
use taskweave_data::{DataBus, ManipulatorInfo};

use crate::hooks::{ExecutionEvent, Observers};
use crate::node::{NodeId, NodeInfo};
use crate::task::FAILURE;

/// Message stored in records of nodes skipped because the run was aborted.
pub const ABORTED_MESSAGE: &str = "Aborted";

// ─────────────────────────────────────────────────────────────────────────────
// Environment
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only parameters shared by every node of a run.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    name: String,
    manipulator: ManipulatorInfo,
    parameters: HashMap<String, serde_json::Value>,
}

impl Environment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the default manipulator.
    #[must_use]
    pub fn with_manipulator(mut self, manipulator: ManipulatorInfo) -> Self {
        self.manipulator = manipulator;
        self
    }

    /// Adds a named parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Environment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default manipulator for programs that do not name one.
    #[must_use]
    pub fn manipulator(&self) -> &ManipulatorInfo {
        &self.manipulator
    }

    /// Looks up a parameter.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&serde_json::Value> {
        self.parameters.get(key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NodeRecord
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable audit entry written once per executed node.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    node_id: NodeId,
    name: String,
    outcome: i32,
    message: String,
    elapsed: Duration,
    environment: Arc<Environment>,
}

impl NodeRecord {
    pub(crate) fn new(
        info: &NodeInfo,
        outcome: i32,
        message: String,
        elapsed: Duration,
        ctx: &ExecutionContext,
    ) -> Self {
        Self {
            node_id: info.id().clone(),
            name: info.name().to_owned(),
            outcome,
            message,
            elapsed,
            environment: Arc::clone(&ctx.inner.environment),
        }
    }

    pub(crate) fn aborted(info: &NodeInfo, ctx: &ExecutionContext) -> Self {
        Self::new(
            info,
            FAILURE,
            ABORTED_MESSAGE.to_owned(),
            Duration::ZERO,
            ctx,
        )
    }

    /// Id of the node that produced the record.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Name of the node at the time it ran.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The integer outcome.
    #[must_use]
    pub fn outcome(&self) -> i32 {
        self.outcome
    }

    /// The node's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Wall time spent in the node.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The environment the node ran against.
    #[must_use]
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// Returns `true` for any nonzero outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome != FAILURE
    }

    /// Returns `true` if the node was skipped because the run was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.outcome == FAILURE && self.message == ABORTED_MESSAGE
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExecutionContext
// ─────────────────────────────────────────────────────────────────────────────

struct ContextInner {
    name: String,
    data: DataBus,
    aborted: AtomicBool,
    environment: Arc<Environment>,
    records: Mutex<Vec<NodeRecord>>,
    observers: Arc<Observers>,
}

/// Shared state of a single run.
///
/// Cloning is cheap and every clone refers to the same run.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    /// Creates a context with an empty bus and a default environment.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    /// Starts building a context.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ContextBuilder {
        ContextBuilder {
            name: name.into(),
            data: DataBus::new(),
            environment: Arc::new(Environment::default()),
            observers: Arc::new(Observers::new()),
        }
    }

    /// Context name, usually the problem being solved.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The data bus.
    #[must_use]
    pub fn data(&self) -> &DataBus {
        &self.inner.data
    }

    /// The read-only environment.
    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.inner.environment
    }

    /// Shared handle to the environment.
    #[must_use]
    pub fn environment_arc(&self) -> Arc<Environment> {
        Arc::clone(&self.inner.environment)
    }

    /// Injected observers.
    #[must_use]
    pub fn observers(&self) -> &Observers {
        &self.inner.observers
    }

    /// Raises the abort flag. It is never lowered again.
    pub fn abort(&self) {
        if !self.inner.aborted.swap(true, Ordering::AcqRel) {
            tracing::warn!(context = %self.inner.name, "run aborted");
        }
    }

    /// Returns `true` once any node has aborted the run.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::Acquire)
    }

    /// Snapshot of the audit trail in append order.
    #[must_use]
    pub fn records(&self) -> Vec<NodeRecord> {
        self.inner.records.lock().clone()
    }

    /// Number of appended records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.inner.records.lock().len()
    }

    /// The most recent record of node `id`.
    #[must_use]
    pub fn record_for(&self, id: &NodeId) -> Option<NodeRecord> {
        self.inner
            .records
            .lock()
            .iter()
            .rev()
            .find(|record| record.node_id() == id)
            .cloned()
    }

    /// The last appended record.
    #[must_use]
    pub fn last_record(&self) -> Option<NodeRecord> {
        self.inner.records.lock().last().cloned()
    }

    pub(crate) fn append(&self, record: NodeRecord) {
        self.inner.records.lock().push(record);
    }

    pub(crate) fn notify(&self, event: &ExecutionEvent) {
        self.inner.observers.notify(event);
    }
}

impl core::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("name", &self.inner.name)
            .field("aborted", &self.is_aborted())
            .field("records", &self.record_count())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExecutionContext`].
pub struct ContextBuilder {
    name: String,
    data: DataBus,
    environment: Arc<Environment>,
    observers: Arc<Observers>,
}

impl ContextBuilder {
    /// Uses a pre-populated data bus.
    #[must_use]
    pub fn data(mut self, data: DataBus) -> Self {
        self.data = data;
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<Arc<Environment>>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Injects an observer registry.
    #[must_use]
    pub fn observers(mut self, observers: Arc<Observers>) -> Self {
        self.observers = observers;
        self
    }

    /// Finishes the context.
    #[must_use]
    pub fn build(self) -> ExecutionContext {
        ExecutionContext {
            inner: Arc::new(ContextInner {
                name: self.name,
                data: self.data,
                aborted: AtomicBool::new(false),
                environment: self.environment,
                records: Mutex::new(Vec::new()),
                observers: self.observers,
            }),
        }
    }
}
