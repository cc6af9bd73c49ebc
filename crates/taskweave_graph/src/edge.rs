//! Outcome-keyed edge table.
//!
//! Each predecessor maps to groups of successors keyed by the outcome that
//! activates them:
//!
//! ```text
//! predecessor -> { outcome -> [successor, ...] }
//! ```
//!
//! A conditional node only follows the group for the outcome it returned. A
//! non-conditional node follows every group.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::node::NodeId;

/// Adjacency of a graph.
#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    edges: HashMap<NodeId, BTreeMap<i32, Vec<NodeId>>>,
    len: usize,
}

impl EdgeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `to` under `outcome` of `from`.
    ///
    /// Returns `false` if the edge already existed.
    pub fn insert(&mut self, from: NodeId, outcome: i32, to: NodeId) -> bool {
        let group = self.edges.entry(from).or_default().entry(outcome).or_default();
        if group.contains(&to) {
            return false;
        }
        group.push(to);
        self.len += 1;
        true
    }

    /// Returns the outcome groups of `from`.
    #[must_use]
    pub fn groups(&self, from: &NodeId) -> Option<&BTreeMap<i32, Vec<NodeId>>> {
        self.edges.get(from)
    }

    /// Successors registered under `outcome` of `from`.
    #[must_use]
    pub fn successors_on(&self, from: &NodeId, outcome: i32) -> &[NodeId] {
        self.edges
            .get(from)
            .and_then(|groups| groups.get(&outcome))
            .map_or(&[], Vec::as_slice)
    }

    /// Union of every group of `from`, in outcome then registration order.
    #[must_use]
    pub fn successors(&self, from: &NodeId) -> Vec<NodeId> {
        let mut union: Vec<NodeId> = Vec::new();
        if let Some(groups) = self.edges.get(from) {
            for to in groups.values().flatten() {
                if !union.contains(to) {
                    union.push(to.clone());
                }
            }
        }
        union
    }

    /// Returns `true` if any group of `from` contains `to`.
    #[must_use]
    pub fn contains(&self, from: &NodeId, to: &NodeId) -> bool {
        self.edges
            .get(from)
            .is_some_and(|groups| groups.values().any(|group| group.contains(to)))
    }

    /// Iterates every `(from, outcome, to)` triple. Order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, i32, &NodeId)> + '_ {
        self.edges.iter().flat_map(|(from, groups)| {
            groups
                .iter()
                .flat_map(move |(outcome, group)| group.iter().map(move |to| (from, *outcome, to)))
        })
    }

    /// Number of distinct `(from, outcome, to)` edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
