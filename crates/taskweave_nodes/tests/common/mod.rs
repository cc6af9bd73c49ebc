#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use std::sync::Arc;

use parking_lot::Mutex;
use taskweave_data::{CompositeInstruction, ManipulatorInfo, MoveInstruction, MoveKind, Waypoint};
use taskweave_graph::prelude::*;
use taskweave_nodes::prelude::*;

pub const PROGRAM_KEY: &str = "program";
pub const PLANNED_KEY: &str = "planned";

// ═══════════════════════════════════════════════════════════════════════════════
// PLANNER LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// One planner invocation: node name, key read, key written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerCall {
    pub node: String,
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, Default)]
pub struct PlannerLog {
    calls: Arc<Mutex<Vec<PlannerCall>>>,
}

impl PlannerLog {
    pub fn calls(&self) -> Vec<PlannerCall> {
        self.calls.lock().clone()
    }

    fn push(&self, call: PlannerCall) {
        self.calls.lock().push(call);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATES
// ═══════════════════════════════════════════════════════════════════════════════

/// A task that copies the composite under its first input key to its first
/// output key and logs the call.
fn planner(log: &PlannerLog, name: &str) -> TaskNode {
    let log = log.clone();
    TaskNode::new(
        name,
        task_fn(move |cx| {
            let (Some(input), Some(output)) = (cx.input_key(0), cx.output_key(0)) else {
                return TaskOutcome::failure("planner needs keys");
            };
            log.push(PlannerCall {
                node: cx.node().name().to_owned(),
                input: input.to_owned(),
                output: output.to_owned(),
            });
            match cx.data().get_composite(input) {
                Ok(segment) => {
                    cx.data().set(output, segment);
                    TaskOutcome::success("planned")
                }
                Err(err) => TaskOutcome::failure(err.to_string()),
            }
        }),
    )
    .with_inputs(["input_data", "settings"])
    .with_outputs(["output_data"])
}

/// Registers `Planner`, which copies its input composite to its output, and
/// `Failing`, which fails and aborts the run.
pub fn registry(log: &PlannerLog) -> Arc<TemplateRegistry> {
    Arc::new(base_registry(log))
}

fn base_registry(log: &PlannerLog) -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();

    let planner_log = log.clone();
    registry.register("Planner", move |name| planner(&planner_log, name).into());

    registry.register("Failing", |name| {
        TaskNode::new(name, task_fn(|_| TaskOutcome::failure("planner failed")))
            .with_inputs(["input_data"])
            .with_outputs(["output_data"])
            .with_abort_terminal(FAILURE)
            .into()
    });

    registry
}

/// [`registry`] plus two graph templates wrapping the planner:
///
/// - `PipelineGraph` exposes the planner's keys on its own header
/// - `ScratchGraph` chains two planners through the fixed key `scratch`
pub fn graph_registry(log: &PlannerLog) -> Arc<TemplateRegistry> {
    let mut registry = base_registry(log);

    let pipeline_log = log.clone();
    registry.register("PipelineGraph", move |name| {
        let mut graph = Graph::new(name);
        graph.info_mut().set_input_keys(["input_data", "settings"]);
        graph.info_mut().set_output_keys(["output_data"]);
        graph.add_node(planner(&pipeline_log, "plan"));
        graph.into()
    });

    let scratch_log = log.clone();
    registry.register("ScratchGraph", move |name| {
        let mut graph = Graph::new(name);
        graph.info_mut().set_input_keys(["input_data"]);
        graph.info_mut().set_output_keys(["output_data"]);
        let first = graph.add_node(
            planner(&scratch_log, "rough")
                .with_inputs(["input_data"])
                .with_outputs(["scratch"]),
        );
        let second = graph.add_node(
            planner(&scratch_log, "refine")
                .with_inputs(["scratch"])
                .with_outputs(["output_data"]),
        );
        graph.add_edge(&first, &second);
        graph.into()
    });

    Arc::new(registry)
}

/// A section with its own remapped and indexed keys.
pub fn section(task: &str, prefix: &str) -> TemplateConfig {
    let input = format!("{prefix}_input");
    let output = format!("{prefix}_output");
    TemplateConfig::new(task)
        .remap_input("input_data", &input)
        .remap_output("output_data", &output)
        .index_inputs([input])
        .index_outputs([output])
}

pub fn config() -> RasterConfig {
    RasterConfig {
        freespace: section("Planner", "freespace"),
        raster: section("Planner", "raster"),
        transition: section("Planner", "transition"),
    }
}

pub fn raster_task(config: RasterConfig, registry: Arc<TemplateRegistry>) -> RasterMotionTask {
    RasterMotionTask::new("RasterMotionTask", PROGRAM_KEY, PLANNED_KEY, true, config, registry)
        .expect("valid raster task")
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROGRAMS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn joint_names() -> Vec<String> {
    (1..=6).map(|i| format!("joint_{i}")).collect()
}

fn state(value: f64) -> Waypoint {
    Waypoint::new(joint_names(), vec![value; 6])
}

/// A composite with one linear move per position.
pub fn segment(description: &str, positions: &[f64]) -> CompositeInstruction {
    positions
        .iter()
        .fold(CompositeInstruction::new(description), |segment, p| {
            segment.with(MoveInstruction::new(description, MoveKind::Linear, state(*p)))
        })
}

pub fn manipulator() -> ManipulatorInfo {
    ManipulatorInfo::new("manipulator", "base_link", "tool0")
}

/// `from_start`, `rasters` rasters separated by transitions, and `to_end`.
///
/// Every move has a distinct position; raster `k` sweeps `10k .. 10k + 2`.
pub fn raster_program(rasters: usize) -> CompositeInstruction {
    let mut program = CompositeInstruction::new("raster_program").with_manipulator(manipulator());
    program.push(segment("from_start", &[0.0, 1.0]));
    for k in 1..=rasters {
        let base = 10.0 * k as f64;
        program.push(segment(&format!("raster_{k}"), &[base, base + 1.0, base + 2.0]));
        if k < rasters {
            program.push(segment(&format!("transition_{k}"), &[base + 5.0]));
        }
    }
    program.push(segment("to_end", &[1000.0]));
    program
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUNNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Runs `task` as the only node of a graph and returns the context.
pub fn run(
    task: RasterMotionTask,
    program: impl Into<taskweave_data::Data>,
    workers: usize,
) -> ExecutionContext {
    let mut graph = Graph::new("raster");
    graph.add_node(task);
    let executor = Executor::new("raster", workers).expect("executor");
    let ctx = ExecutionContext::new("raster");
    ctx.data().set(PROGRAM_KEY, program);
    executor.run_graph(graph, &ctx).expect("valid graph").wait();
    ctx
}

/// Record of the raster task itself.
pub fn raster_record(ctx: &ExecutionContext) -> NodeRecord {
    ctx.records()
        .into_iter()
        .rev()
        .find(|r| r.name() == "RasterMotionTask")
        .expect("raster task record")
}
