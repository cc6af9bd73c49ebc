//! Boundary stitching between planned segments.
//!
//! Each merge task reads a template composite, overwrites its start and/or
//! end state with states taken from neighbouring planned segments, and
//! writes the result to its output key for the next planner.
//!
//! The template lives on the bus under the merge node's own id, which is
//! always its first input key, so concurrent merge nodes never share one.

use taskweave_data::CompositeInstruction;
use taskweave_graph::node::TaskNode;
use taskweave_graph::task::{Task, TaskContext, TaskOutcome};

use super::SUCCESSFUL;

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn merge_node(name: &str, task: impl Task, sources: &[&str], output: &str) -> TaskNode {
    let mut node = TaskNode::new(name, task);
    let template = node.info().id().as_str().to_owned();
    let inputs = core::iter::once(template).chain(sources.iter().map(|s| (*s).to_owned()));
    node.info_mut().set_input_keys(inputs);
    node.info_mut().set_output_keys([output]);
    node
}

fn keys<'a, const N: usize>(
    cx: &TaskContext<'a>,
    task: &str,
) -> Result<([&'a str; N], &'a str), String> {
    let inputs = cx.node().input_keys();
    let output = cx.output_key(0);
    match output {
        Some(output) if inputs.len() >= N => Ok((core::array::from_fn(|i| inputs[i].as_str()), output)),
        _ => Err(format!("{task} needs {N} input keys and one output key")),
    }
}

fn read(cx: &TaskContext<'_>, key: &str) -> Result<CompositeInstruction, String> {
    cx.data().get_composite(key).map_err(|err| err.to_string())
}

fn finish(
    cx: &TaskContext<'_>,
    merged: Result<(CompositeInstruction, &str), String>,
) -> TaskOutcome {
    match merged {
        Ok((template, output)) => {
            cx.data().set(output, template);
            TaskOutcome::success(SUCCESSFUL)
        }
        Err(message) => {
            tracing::debug!(node = %cx.node().name(), %message, "state update failed");
            TaskOutcome::failure(message)
        }
    }
}

fn set_start(
    template: &mut CompositeInstruction,
    previous: &CompositeInstruction,
    key: &str,
) -> Result<(), String> {
    let state = previous
        .last_move()
        .ok_or_else(|| format!("'{key}' has no move instruction"))?
        .waypoint
        .clone();
    template
        .first_move_mut()
        .ok_or_else(|| "template has no move instruction".to_owned())?
        .waypoint = state;
    Ok(())
}

fn set_end(
    template: &mut CompositeInstruction,
    next: &CompositeInstruction,
    key: &str,
) -> Result<(), String> {
    let state = next
        .first_move()
        .ok_or_else(|| format!("'{key}' has no move instruction"))?
        .waypoint
        .clone();
    template
        .last_move_mut()
        .ok_or_else(|| "template has no move instruction".to_owned())?
        .waypoint = state;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// UpdateStartAndEndStateTask
// ─────────────────────────────────────────────────────────────────────────────

/// Starts the template where the previous segment ended and ends it where
/// the next segment starts.
///
/// Inputs: `[template, previous, next]`. Output: `[merged]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateStartAndEndStateTask;

impl UpdateStartAndEndStateTask {
    /// Node name.
    pub const NAME: &'static str = "UpdateStartAndEndStateTask";

    /// Builds a merge node. The template key is the node's id.
    #[must_use]
    pub fn node(previous: &str, next: &str, output: &str) -> TaskNode {
        merge_node(Self::NAME, Self, &[previous, next], output)
    }
}

impl Task for UpdateStartAndEndStateTask {
    fn run(&self, cx: &TaskContext<'_>) -> TaskOutcome {
        let merged = keys::<3>(cx, Self::NAME).and_then(|([template, previous, next], output)| {
            let mut merged = read(cx, template)?;
            set_start(&mut merged, &read(cx, previous)?, previous)?;
            set_end(&mut merged, &read(cx, next)?, next)?;
            Ok((merged, output))
        });
        finish(cx, merged)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UpdateEndStateTask
// ─────────────────────────────────────────────────────────────────────────────

/// Ends the template where the next segment starts.
///
/// Inputs: `[template, next]`. Output: `[merged]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateEndStateTask;

impl UpdateEndStateTask {
    /// Node name.
    pub const NAME: &'static str = "UpdateEndStateTask";

    /// Builds a merge node. The template key is the node's id.
    #[must_use]
    pub fn node(next: &str, output: &str) -> TaskNode {
        merge_node(Self::NAME, Self, &[next], output)
    }
}

impl Task for UpdateEndStateTask {
    fn run(&self, cx: &TaskContext<'_>) -> TaskOutcome {
        let merged = keys::<2>(cx, Self::NAME).and_then(|([template, next], output)| {
            let mut merged = read(cx, template)?;
            set_end(&mut merged, &read(cx, next)?, next)?;
            Ok((merged, output))
        });
        finish(cx, merged)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UpdateStartStateTask
// ─────────────────────────────────────────────────────────────────────────────

/// Starts the template where the previous segment ended.
///
/// Inputs: `[template, previous]`. Output: `[merged]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateStartStateTask;

impl UpdateStartStateTask {
    /// Node name.
    pub const NAME: &'static str = "UpdateStartStateTask";

    /// Builds a merge node. The template key is the node's id.
    #[must_use]
    pub fn node(previous: &str, output: &str) -> TaskNode {
        merge_node(Self::NAME, Self, &[previous], output)
    }
}

impl Task for UpdateStartStateTask {
    fn run(&self, cx: &TaskContext<'_>) -> TaskOutcome {
        let merged = keys::<2>(cx, Self::NAME).and_then(|([template, previous], output)| {
            let mut merged = read(cx, template)?;
            set_start(&mut merged, &read(cx, previous)?, previous)?;
            Ok((merged, output))
        });
        finish(cx, merged)
    }
}
