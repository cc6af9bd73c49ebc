//! A stand-in motion planner that densifies segments by interpolation.

use std::sync::Arc;

use taskweave_data::{CompositeInstruction, Instruction, MoveInstruction, MoveKind, Waypoint};
use taskweave_graph::node::TaskNode;
use taskweave_graph::task::{FAILURE, Task, TaskContext, TaskOutcome};
use taskweave_nodes::registry::TemplateRegistry;

/// Environment parameter holding the number of states inserted between two
/// consecutive moves.
pub const STEPS_PARAMETER: &str = "interpolation_steps";

/// Inserts evenly spaced states between consecutive moves of a segment.
///
/// The first element is kept in place, since the raster pipeline strips it
/// when stitching segments back together.
struct InterpolatePlanner {
    kind: MoveKind,
}

impl InterpolatePlanner {
    fn densify(&self, segment: &CompositeInstruction, steps: usize) -> CompositeInstruction {
        let mut planned = segment.clone();
        planned.clear();
        let mut previous: Option<&MoveInstruction> = None;
        for instruction in segment.iter() {
            if let (Some(from), Instruction::Move(to)) = (previous, instruction) {
                for step in 1..=steps {
                    let t = step as f64 / (steps + 1) as f64;
                    let waypoint = lerp(&from.waypoint, &to.waypoint, t);
                    planned.push(
                        MoveInstruction::new("interpolated", self.kind, waypoint)
                            .with_profile(to.profile.clone()),
                    );
                }
            }
            if let Instruction::Move(mv) = instruction {
                previous = Some(mv);
            }
            planned.push(instruction.clone());
        }
        planned
    }
}

fn lerp(from: &Waypoint, to: &Waypoint, t: f64) -> Waypoint {
    let positions = from
        .positions
        .iter()
        .zip(&to.positions)
        .map(|(a, b)| a + (b - a) * t)
        .collect();
    Waypoint::new(to.joint_names.clone(), positions)
}

impl Task for InterpolatePlanner {
    fn run(&self, cx: &TaskContext<'_>) -> TaskOutcome {
        let (Some(input), Some(output)) = (cx.input_key(0), cx.output_key(0)) else {
            return TaskOutcome::failure("planner needs one input key and one output key");
        };
        let segment = match cx.data().get_composite(input) {
            Ok(segment) => segment,
            Err(err) => return TaskOutcome::failure(err.to_string()),
        };
        let steps = cx
            .environment()
            .parameter(STEPS_PARAMETER)
            .and_then(serde_json::Value::as_u64)
            .map_or(1, |steps| steps as usize);

        let planned = self.densify(&segment, steps);
        let states = planned.move_count();
        cx.data().set(output, planned);
        TaskOutcome::success(format!("planned {states} states"))
    }
}

/// Registers `FreespacePlanner` and `RasterPlanner`.
///
/// A failing planner aborts the whole run.
pub fn registry() -> Arc<TemplateRegistry> {
    let mut registry = TemplateRegistry::new();
    for (name, kind) in [
        ("FreespacePlanner", MoveKind::Freespace),
        ("RasterPlanner", MoveKind::Linear),
    ] {
        registry.register(name, move |node_name| {
            TaskNode::new(node_name, InterpolatePlanner { kind })
                .with_inputs(["input_data"])
                .with_outputs(["output_data"])
                .with_abort_terminal(FAILURE)
                .into()
        });
    }
    Arc::new(registry)
}
