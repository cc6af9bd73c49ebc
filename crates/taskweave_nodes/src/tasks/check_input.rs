use taskweave_graph::node::TaskNode;
use taskweave_graph::task::{Task, TaskContext, TaskOutcome};

use super::SUCCESSFUL;

/// Routes on whether every input key is present on the bus.
///
/// Conditional by default: outcome `1` when all keys are present, `0` with
/// `"Missing input key: <key>"` for the first absent one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckInputTask;

impl CheckInputTask {
    /// Builds a conditional check over `keys`.
    #[must_use]
    pub fn node(
        name: impl Into<String>,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> TaskNode {
        TaskNode::new(name, Self).with_inputs(keys).conditional(true)
    }
}

impl Task for CheckInputTask {
    fn run(&self, cx: &TaskContext<'_>) -> TaskOutcome {
        let missing = cx
            .node()
            .input_keys()
            .iter()
            .find(|key| !cx.data().contains(key));
        match missing {
            Some(key) => TaskOutcome::failure(format!("Missing input key: {key}")),
            None => TaskOutcome::success(SUCCESSFUL),
        }
    }
}
