//! Graph structure and builder API.
//!
//! A [`Graph`] owns its child nodes and an [`EdgeTable`]. It is itself a
//! node: wrap it in [`Node::Graph`] to nest it in a parent.
//!
//! # Example
//!
//! ```
//! use taskweave_graph::graph::Graph;
//! use taskweave_graph::task::{TaskOutcome, task_fn};
//!
//! let mut graph = Graph::new("pipeline");
//! let start = graph.add_task("start", task_fn(|_| TaskOutcome::success("go")));
//! let a = graph.add_task("a", task_fn(|_| TaskOutcome::success("a")));
//! let b = graph.add_task("b", task_fn(|_| TaskOutcome::success("b")));
//! let join = graph.add_task("join", task_fn(|_| TaskOutcome::success("both done")));
//!
//! graph
//!     .add_edges(&start, &[a.clone(), b.clone()])
//!     .add_edge(&a, &join)
//!     .add_edge(&b, &join);
//!
//! assert!(graph.validate().is_ok());
//! assert_eq!(graph.predecessors(&join), vec![a, b]);
//! ```

use core::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use hashbrown::{HashMap, HashSet};

use crate::edge::EdgeTable;
use crate::node::{Node, NodeId, NodeInfo, TaskNode};
use crate::task::{SUCCESS, Task};

/// A container node composed of child nodes and outcome-keyed edges.
#[derive(Debug, Clone)]
pub struct Graph {
    info: NodeInfo,
    nodes: Vec<Node>,
    positions: HashMap<NodeId, usize>,
    edges: EdgeTable,
    terminals: Vec<NodeId>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: NodeInfo::new(name),
            nodes: Vec::new(),
            positions: HashMap::new(),
            edges: EdgeTable::new(),
            terminals: Vec::new(),
        }
    }

    /// Returns the graph's own node header.
    #[must_use]
    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    /// Returns the mutable node header.
    pub fn info_mut(&mut self) -> &mut NodeInfo {
        &mut self.info
    }

    /// Returns the graph's id.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        self.info.id()
    }

    /// Returns the graph's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// Marks the graph conditional when nested in a parent.
    #[must_use]
    pub fn conditional(mut self, conditional: bool) -> Self {
        self.info.set_conditional(conditional);
        self
    }

    // ─────────────────────────────────────────────────────────────────────
    // Builder API
    // ─────────────────────────────────────────────────────────────────────

    /// Adds a child node and returns its id.
    pub fn add_node(&mut self, node: impl Into<Node>) -> NodeId {
        let node = node.into();
        let id = node.id().clone();
        self.positions.entry(id.clone()).or_insert(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Adds an unconditional task with no keys.
    pub fn add_task(&mut self, name: impl Into<String>, task: impl Task) -> NodeId {
        self.add_node(TaskNode::new(name, task))
    }

    /// Adds a conditional task with no keys.
    pub fn add_conditional_task(&mut self, name: impl Into<String>, task: impl Task) -> NodeId {
        self.add_node(TaskNode::new(name, task).conditional(true))
    }

    /// Adds an edge activated by outcome [`SUCCESS`].
    ///
    /// For non-conditional predecessors the outcome key is irrelevant: every
    /// outgoing edge fires.
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId) -> &mut Self {
        self.add_edge_on(from, SUCCESS, to)
    }

    /// Adds one [`SUCCESS`] edge from `from` to each of `to`.
    pub fn add_edges(&mut self, from: &NodeId, to: &[NodeId]) -> &mut Self {
        for target in to {
            self.add_edge_on(from, SUCCESS, target);
        }
        self
    }

    /// Adds an edge activated when `from` returns `outcome`.
    pub fn add_edge_on(&mut self, from: &NodeId, outcome: i32, to: &NodeId) -> &mut Self {
        self.edges.insert(from.clone(), outcome, to.clone());
        self
    }

    /// Adds one edge per target, where target `i` is activated by outcome `i`.
    pub fn add_conditional_edges(&mut self, from: &NodeId, to: &[NodeId]) -> &mut Self {
        for (outcome, target) in to.iter().enumerate() {
            let outcome = i32::try_from(outcome).unwrap_or(i32::MAX);
            self.add_edge_on(from, outcome, target);
        }
        self
    }

    /// Designates terminal nodes.
    ///
    /// When nested, the graph's outcome is the position in this list of the
    /// first terminal that ran.
    pub fn set_terminals(&mut self, terminals: impl IntoIterator<Item = NodeId>) -> &mut Self {
        self.terminals = terminals.into_iter().collect();
        self
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Child nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// Looks up a child.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.positions.get(id).map(|&index| &self.nodes[index])
    }

    /// Insertion position of a child.
    #[must_use]
    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Number of children.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The edge table.
    #[must_use]
    pub fn edges(&self) -> &EdgeTable {
        &self.edges
    }

    /// Designated terminals.
    #[must_use]
    pub fn terminals(&self) -> &[NodeId] {
        &self.terminals
    }

    /// Union of all successors of `id`.
    #[must_use]
    pub fn successors(&self, id: &NodeId) -> Vec<NodeId> {
        self.edges.successors(id)
    }

    /// Successors activated when `id` returns `outcome`.
    #[must_use]
    pub fn successors_on(&self, id: &NodeId, outcome: i32) -> &[NodeId] {
        self.edges.successors_on(id, outcome)
    }

    /// Distinct predecessors of `id`, in insertion order.
    #[must_use]
    pub fn predecessors(&self, id: &NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(Node::id)
            .filter(|from| self.edges.contains(from, id))
            .cloned()
            .collect()
    }

    /// Children with no predecessors, in insertion order.
    #[must_use]
    pub fn sources(&self) -> Vec<NodeId> {
        let topology = self.topology();
        self.nodes
            .iter()
            .enumerate()
            .filter(|(index, _)| topology.predecessors[*index] == 0)
            .map(|(_, node)| node.id().clone())
            .collect()
    }

    /// A topological order that breaks ties by insertion order.
    ///
    /// Returns `None` if the edges contain a cycle.
    #[must_use]
    pub fn topological_order(&self) -> Option<Vec<NodeId>> {
        let (order, _) = self.topology().kahn();
        (order.len() == self.nodes.len())
            .then(|| order.into_iter().map(|i| self.nodes[i].id().clone()).collect())
    }

    /// Validates the graph structure.
    ///
    /// Checks that the graph is non-empty, that ids are unique, that every
    /// edge and terminal references a child, and that the edges are acyclic.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.nodes.is_empty() {
            errors.push(ValidationError::EmptyGraph);
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id()) {
                errors.push(ValidationError::DuplicateNode {
                    node: node.id().clone(),
                    name: node.name().to_owned(),
                });
            }
        }

        let mut edges: Vec<(&NodeId, i32, &NodeId)> = self.edges.iter().collect();
        edges.sort_by_key(|(from, outcome, to)| {
            (self.position(from), *outcome, self.position(to))
        });
        for (from, _, to) in edges {
            if !self.positions.contains_key(from) {
                errors.push(ValidationError::InvalidEdgeSource {
                    from: from.clone(),
                    to: to.clone(),
                });
            } else if !self.positions.contains_key(to) {
                errors.push(ValidationError::InvalidEdgeTarget {
                    from: from.clone(),
                    to: to.clone(),
                });
            } else if from == to {
                errors.push(ValidationError::SelfLoop { node: from.clone() });
            }
        }

        for terminal in &self.terminals {
            if !self.positions.contains_key(terminal) {
                errors.push(ValidationError::InvalidTerminal {
                    node: terminal.clone(),
                });
            }
        }

        let (order, stuck) = self.topology().kahn();
        if order.len() < self.nodes.len() {
            errors.push(ValidationError::CycleDetected {
                nodes: stuck.into_iter().map(|i| self.nodes[i].id().clone()).collect(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub(crate) fn topology(&self) -> Topology {
        Topology::new(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Topology
// ─────────────────────────────────────────────────────────────────────────────

/// Index-based view of a graph used by the scheduler.
///
/// Edges that reference unknown children are dropped.
pub(crate) struct Topology {
    /// Union of successors per node, ascending by insertion position.
    pub(crate) successors: Vec<Vec<usize>>,
    /// Successors per outcome group.
    pub(crate) routes: Vec<BTreeMap<i32, Vec<usize>>>,
    /// Distinct predecessor count per node.
    pub(crate) predecessors: Vec<usize>,
    conditional: Vec<bool>,
}

impl Topology {
    fn new(graph: &Graph) -> Self {
        let count = graph.nodes.len();
        let mut successors = vec![Vec::new(); count];
        let mut routes = vec![BTreeMap::new(); count];
        let mut predecessors = vec![0; count];

        for (index, node) in graph.nodes.iter().enumerate() {
            let Some(groups) = graph.edges.groups(node.id()) else {
                continue;
            };
            for (&outcome, group) in groups {
                let mut targets: Vec<usize> =
                    group.iter().filter_map(|to| graph.position(to)).collect();
                targets.sort_unstable();
                successors[index].extend(targets.iter().copied());
                routes[index].insert(outcome, targets);
            }
            successors[index].sort_unstable();
            successors[index].dedup();
            for &succ in &successors[index] {
                predecessors[succ] += 1;
            }
        }

        Self {
            successors,
            routes,
            predecessors,
            conditional: graph.nodes.iter().map(|n| n.info().is_conditional()).collect(),
        }
    }

    /// Successors activated when node `index` returns `outcome`.
    pub(crate) fn selected(&self, index: usize, outcome: i32) -> &[usize] {
        if self.conditional[index] {
            self.routes[index].get(&outcome).map_or(&[], Vec::as_slice)
        } else {
            &self.successors[index]
        }
    }

    /// Kahn's algorithm with a min-heap so ties resolve by insertion order.
    ///
    /// Returns the order found and the nodes that never reached in-degree 0.
    fn kahn(&self) -> (Vec<usize>, Vec<usize>) {
        let mut indegree = self.predecessors.clone();
        let mut heap: BinaryHeap<Reverse<usize>> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut order = Vec::with_capacity(indegree.len());

        while let Some(Reverse(index)) = heap.pop() {
            order.push(index);
            for &succ in &self.successors[index] {
                indegree[succ] -= 1;
                if indegree[succ] == 0 {
                    heap.push(Reverse(succ));
                }
            }
        }

        let stuck = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > 0)
            .map(|(i, _)| i)
            .collect();
        (order, stuck)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ValidationError
// ─────────────────────────────────────────────────────────────────────────────

/// Structural problems found by [`Graph::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The graph has no children.
    EmptyGraph,
    /// Two children share an id.
    DuplicateNode {
        /// The repeated id.
        node: NodeId,
        /// Name of the second occurrence.
        name: String,
    },
    /// An edge starts at a node that is not a child.
    InvalidEdgeSource {
        /// Edge source.
        from: NodeId,
        /// Edge target.
        to: NodeId,
    },
    /// An edge ends at a node that is not a child.
    InvalidEdgeTarget {
        /// Edge source.
        from: NodeId,
        /// Edge target.
        to: NodeId,
    },
    /// A node has an edge to itself.
    SelfLoop {
        /// The node.
        node: NodeId,
    },
    /// The edges contain at least one cycle.
    CycleDetected {
        /// Nodes on or downstream of a cycle.
        nodes: Vec<NodeId>,
    },
    /// A designated terminal is not a child.
    InvalidTerminal {
        /// The unknown terminal.
        node: NodeId,
    },
}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ValidationError::EmptyGraph => write!(f, "graph has no nodes"),
            ValidationError::DuplicateNode { node, name } => {
                write!(f, "node '{name}' reuses id {node}")
            }
            ValidationError::InvalidEdgeSource { from, to } => {
                write!(f, "edge {from} -> {to} has invalid source node")
            }
            ValidationError::InvalidEdgeTarget { from, to } => {
                write!(f, "edge {from} -> {to} has invalid target node")
            }
            ValidationError::SelfLoop { node } => write!(f, "node {node} has an edge to itself"),
            ValidationError::CycleDetected { nodes } => {
                write!(f, "cycle detected among {} node(s)", nodes.len())
            }
            ValidationError::InvalidTerminal { node } => {
                write!(f, "terminal references invalid node: {node}")
            }
        }
    }
}

impl core::error::Error for ValidationError {}
