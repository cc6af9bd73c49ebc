use taskweave_graph::node::TaskNode;
use taskweave_graph::task::{Task, TaskContext, TaskOutcome};

use super::SUCCESSFUL;

/// Does nothing and succeeds. Used as the single source of generated graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartTask;

impl StartTask {
    /// Default node name.
    pub const NAME: &'static str = "StartTask";

    /// Builds a start node.
    #[must_use]
    pub fn node() -> TaskNode {
        TaskNode::new(Self::NAME, Self)
    }
}

impl Task for StartTask {
    fn run(&self, _cx: &TaskContext<'_>) -> TaskOutcome {
        TaskOutcome::success(SUCCESSFUL)
    }
}
