//! Events emitted while a run progresses.
//!
//! Observers receive `&ExecutionEvent` and match on the variants they care
//! about.

use core::time::Duration;

use crate::node::NodeId;

/// Every event an executor emits.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    // ─────────────────────────────────────────────────────────────────────────
    // Run-Level Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A graph run was scheduled.
    RunStarted {
        /// Graph name.
        graph: String,
        /// Number of children.
        node_count: usize,
    },

    /// Every child of a graph run reached a terminal state.
    RunCompleted {
        /// Graph name.
        graph: String,
        /// Wall time since scheduling.
        duration: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Node Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A node started its work.
    NodeStarted {
        /// The node id.
        node_id: NodeId,
        /// The node name.
        name: String,
    },

    /// A node finished its work and its record was appended.
    NodeCompleted {
        /// The node id.
        node_id: NodeId,
        /// The node name.
        name: String,
        /// Reported outcome.
        outcome: i32,
        /// Time spent in the node.
        duration: Duration,
    },

    /// A node was recorded as aborted without running.
    NodeAborted {
        /// The node id.
        node_id: NodeId,
        /// The node name.
        name: String,
    },

    /// A node was pruned because no incoming edge was taken.
    NodeSkipped {
        /// The node id.
        node_id: NodeId,
        /// The node name.
        name: String,
    },
}

/// Discriminant of an [`ExecutionEvent`], used to filter observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`ExecutionEvent::RunStarted`].
    RunStarted,
    /// [`ExecutionEvent::RunCompleted`].
    RunCompleted,
    /// [`ExecutionEvent::NodeStarted`].
    NodeStarted,
    /// [`ExecutionEvent::NodeCompleted`].
    NodeCompleted,
    /// [`ExecutionEvent::NodeAborted`].
    NodeAborted,
    /// [`ExecutionEvent::NodeSkipped`].
    NodeSkipped,
}

impl ExecutionEvent {
    /// Returns the event's discriminant.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            ExecutionEvent::RunStarted { .. } => EventKind::RunStarted,
            ExecutionEvent::RunCompleted { .. } => EventKind::RunCompleted,
            ExecutionEvent::NodeStarted { .. } => EventKind::NodeStarted,
            ExecutionEvent::NodeCompleted { .. } => EventKind::NodeCompleted,
            ExecutionEvent::NodeAborted { .. } => EventKind::NodeAborted,
            ExecutionEvent::NodeSkipped { .. } => EventKind::NodeSkipped,
        }
    }
}
