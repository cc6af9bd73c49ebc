//! Integration tests for the raster sub-graph builder.
//!
//! The `Planner` template copies its input segment to its output, so a
//! successful run must reproduce every segment of the input program.

mod common;

use std::sync::Arc;

use common::{
    PLANNED_KEY, PROGRAM_KEY, PlannerLog, config, graph_registry, manipulator, raster_program,
    raster_record, raster_task, registry, run, section, segment,
};
use serde_json::json;
use taskweave_data::{CompositeInstruction, Instruction, ManipulatorInfo, MoveInstruction, MoveKind};
use taskweave_graph::prelude::*;
use taskweave_nodes::prelude::*;

fn count_prefixed(ctx: &ExecutionContext, prefix: &str) -> usize {
    ctx.records()
        .iter()
        .filter(|r| r.name().starts_with(prefix))
        .count()
}

fn assert_bus_untouched(ctx: &ExecutionContext) {
    assert_eq!(ctx.data().keys(), [PROGRAM_KEY]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUCCESSFUL RUNS
// ═══════════════════════════════════════════════════════════════════════════════

fn assert_reassembled(workers: usize) {
    let log = PlannerLog::default();
    let program = raster_program(4);
    let ctx = run(raster_task(config(), registry(&log)), program.clone(), workers);

    let record = raster_record(&ctx);
    assert_eq!(record.outcome(), SUCCESS, "{}", record.message());
    assert_eq!(record.message(), SUCCESSFUL);

    let planned = ctx.data().get_composite(PLANNED_KEY).expect("planned program");
    assert_eq!(planned.len(), 9);
    assert_eq!(planned.description, program.description);
    assert_eq!(planned.manipulator, Some(manipulator()));
    for (planned, original) in planned.iter().zip(program.iter()) {
        let (Some(planned), Some(original)) = (planned.as_composite(), original.as_composite())
        else {
            panic!("every segment is a composite");
        };
        assert_eq!(planned.description, original.description);
        assert_eq!(planned.instructions(), original.instructions());
    }

    // One planner call per segment, plus the boundary nodes.
    assert_eq!(log.calls().len(), 9);
    assert_eq!(count_prefixed(&ctx, "Raster #"), 4);
    assert_eq!(count_prefixed(&ctx, "Transition #"), 3);
    assert_eq!(count_prefixed(&ctx, UpdateStartAndEndStateTask::NAME), 3);
    assert_eq!(count_prefixed(&ctx, UpdateEndStateTask::NAME), 1);
    assert_eq!(count_prefixed(&ctx, UpdateStartStateTask::NAME), 1);
    assert_eq!(count_prefixed(&ctx, "From Start: "), 1);
    assert_eq!(count_prefixed(&ctx, "To End: "), 1);
    assert_eq!(ctx.record_count(), 16);
}

#[test]
fn four_rasters_on_a_single_worker() {
    assert_reassembled(1);
}

#[test]
fn four_rasters_on_many_workers() {
    assert_reassembled(4);
}

#[test]
fn rasters_are_planned_before_boundaries_on_one_worker() {
    let log = PlannerLog::default();
    run(raster_task(config(), registry(&log)), raster_program(4), 1);

    let names: Vec<String> = log.calls().into_iter().map(|c| c.node).collect();
    assert_eq!(
        names[..4],
        [
            "Raster #1: raster_1",
            "Raster #2: raster_2",
            "Raster #3: raster_3",
            "Raster #4: raster_4",
        ]
    );
}

#[test]
fn single_raster_has_no_transitions() {
    let log = PlannerLog::default();
    let ctx = run(raster_task(config(), registry(&log)), raster_program(1), 2);

    assert!(raster_record(&ctx).is_success());
    assert_eq!(count_prefixed(&ctx, "Transition #"), 0);
    assert_eq!(count_prefixed(&ctx, UpdateStartAndEndStateTask::NAME), 0);
    let planned = ctx.data().get_composite(PLANNED_KEY).expect("planned program");
    assert_eq!(planned.len(), 3);
}

#[test]
fn every_instance_uses_its_own_keys() {
    let log = PlannerLog::default();
    run(raster_task(config(), registry(&log)), raster_program(4), 4);

    let calls = log.calls();
    let mut inputs: Vec<&str> = calls.iter().map(|c| c.input.as_str()).collect();
    let mut outputs: Vec<&str> = calls.iter().map(|c| c.output.as_str()).collect();
    inputs.sort_unstable();
    inputs.dedup();
    outputs.sort_unstable();
    outputs.dedup();
    assert_eq!(inputs.len(), calls.len());
    assert_eq!(outputs.len(), calls.len());
    for call in &calls {
        assert_ne!(call.input, call.output);
        assert!(![PROGRAM_KEY, PLANNED_KEY].contains(&call.output.as_str()));
    }

    let from_start = calls
        .iter()
        .find(|c| c.node.starts_with("From Start: "))
        .expect("from_start call");
    assert_eq!(from_start.input, "freespace_input1");
    let to_end = calls
        .iter()
        .find(|c| c.node.starts_with("To End: "))
        .expect("to_end call");
    assert_eq!(to_end.output, "freespace_output2");
}

#[test]
fn graph_template_children_use_the_instance_keys() {
    let log = PlannerLog::default();
    let mut sections = config();
    sections.raster = section("PipelineGraph", "raster");
    let program = raster_program(4);
    let ctx = run(raster_task(sections, graph_registry(&log)), program.clone(), 4);

    let record = raster_record(&ctx);
    assert_eq!(record.outcome(), SUCCESS, "{}", record.message());
    let planned = ctx.data().get_composite(PLANNED_KEY).expect("planned program");
    assert_eq!(planned.len(), 9);
    for (planned, original) in planned.iter().zip(program.iter()) {
        let (Some(planned), Some(original)) = (planned.as_composite(), original.as_composite())
        else {
            panic!("every segment is a composite");
        };
        assert_eq!(planned.instructions(), original.instructions());
    }

    let mut children: Vec<(String, String)> = log
        .calls()
        .into_iter()
        .filter(|call| call.node == "plan")
        .map(|call| (call.input, call.output))
        .collect();
    children.sort_unstable();
    assert_eq!(
        children,
        (1..=4)
            .map(|i| (format!("raster_input{i}"), format!("raster_output{i}")))
            .collect::<Vec<_>>()
    );
}

#[test]
fn nested_keys_shared_between_instances_are_rejected() {
    let mut sections = config();
    sections.raster = section("ScratchGraph", "raster");
    let task = raster_task(sections, graph_registry(&PlannerLog::default()));

    let err = task
        .plan(&raster_program(2), &ManipulatorInfo::default())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "sub-graph instances 'Raster #1: raster_1' and 'Raster #2: raster_2' share the key 'scratch'"
    );

    let mut sections = config();
    sections.raster = section("ScratchGraph", "raster");
    let log = PlannerLog::default();
    let ctx = run(raster_task(sections, graph_registry(&log)), raster_program(2), 2);
    assert_eq!(raster_record(&ctx).outcome(), FAILURE);
    assert_bus_untouched(&ctx);
    assert!(log.calls().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLANNING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn plan_describes_graph_and_seeds() {
    let task = raster_task(config(), registry(&PlannerLog::default()));
    let program = raster_program(4);
    let plan = task.plan(&program, &ManipulatorInfo::default()).expect("plan");

    assert_eq!(plan.raster_count(), 4);
    assert_eq!(plan.transition_count(), 3);
    // start + 4 rasters + 3 (transition, mux) + 2 (boundary, update)
    assert_eq!(plan.graph().node_count(), 15);
    assert!(plan.graph().validate().is_ok());
    assert_eq!(plan.seeds().len(), 9);

    let keys: Vec<&str> = plan.output_keys().collect();
    assert_eq!(
        keys,
        [
            "freespace_output1",
            "raster_output1",
            "transition_output1",
            "raster_output2",
            "transition_output2",
            "raster_output3",
            "transition_output3",
            "raster_output4",
            "freespace_output2",
        ]
    );

    // Raster #1 is seeded with the last move of from_start prepended.
    let (key, seed) = &plan.seeds()[0];
    assert_eq!(key, "raster_input1");
    let anchor = program
        .get(0)
        .and_then(Instruction::as_composite)
        .and_then(CompositeInstruction::last_move)
        .expect("from_start move");
    assert_eq!(seed.get(0).and_then(Instruction::as_move), Some(anchor));
    assert_eq!(seed.len(), 4);
}

#[test]
fn environment_fills_missing_manipulator_fields() {
    let task = raster_task(config(), registry(&PlannerLog::default()));
    let mut program = raster_program(1);
    program.manipulator = None;
    let environment = manipulator();

    let plan = task.plan(&program, &environment).expect("plan");

    for (_, seed) in plan.seeds() {
        assert_eq!(seed.manipulator.as_ref(), Some(&environment));
    }
}

#[test]
fn without_executor_fails_before_writing() {
    let task = raster_task(config(), registry(&PlannerLog::default()));
    let ctx = ExecutionContext::new("raster");
    ctx.data().set(PROGRAM_KEY, raster_program(2));

    let record = Node::from(task).execute(&ctx, None);

    assert_eq!(record.outcome(), FAILURE);
    assert_eq!(record.message(), "RasterMotionTask requires an executor");
    assert_bus_untouched(&ctx);
}

// ═══════════════════════════════════════════════════════════════════════════════
// INVALID PROGRAMS
// ═══════════════════════════════════════════════════════════════════════════════

fn linear(position: f64) -> MoveInstruction {
    let state = segment("state", &[position])
        .first_move()
        .map(|m| m.waypoint.clone())
        .expect("state");
    MoveInstruction::new("move", MoveKind::Linear, state)
}

fn assert_rejected(program: impl Into<taskweave_data::Data>, message: &str) {
    let task = raster_task(config(), registry(&PlannerLog::default()));
    let ctx = run(task, program, 2);

    let record = raster_record(&ctx);
    assert_eq!(record.outcome(), FAILURE);
    assert_eq!(record.message(), message);
    assert_eq!(ctx.record_count(), 1);
    assert_bus_untouched(&ctx);
}

#[test]
fn missing_program_is_reported() {
    let task = raster_task(config(), registry(&PlannerLog::default()));
    let mut graph = Graph::new("raster");
    graph.add_node(task);
    let executor = Executor::new("raster", 1).expect("executor");
    let ctx = ExecutionContext::new("raster");

    executor.run_graph(graph, &ctx).expect("valid graph").wait();

    assert_eq!(
        raster_record(&ctx).message(),
        "Input instructions to RasterMotionTask are missing"
    );
    assert!(ctx.data().is_empty());
}

#[test]
fn non_composite_program_is_reported() {
    assert_rejected(
        json!({ "program": "not an instruction" }),
        "Input instructions to RasterMotionTask are not a composite instruction",
    );
}

#[test]
fn even_length_program_is_rejected() {
    let program = raster_program(1).with(segment("extra", &[5.0]));
    assert_rejected(
        program,
        "program must alternate from_start, rasters, transitions and to_end \
         (odd length of at least 3, got 4)",
    );
}

#[test]
fn non_composite_segments_are_rejected() {
    let base = |first: Instruction, middle: Instruction, last: Instruction| {
        CompositeInstruction::new("program")
            .with(first)
            .with(middle)
            .with(last)
    };
    let composite = |name: &str| Instruction::Composite(segment(name, &[1.0]));
    let single = || Instruction::Move(linear(1.0));

    assert_rejected(
        base(single(), composite("raster"), composite("to_end")),
        "from_start should be a composite",
    );
    assert_rejected(
        base(composite("from_start"), single(), composite("to_end")),
        "Both rasters and transitions should be a composite",
    );
    assert_rejected(
        base(composite("from_start"), composite("raster"), single()),
        "to_end should be a composite",
    );
}

#[test]
fn segment_without_moves_is_rejected() {
    let program = CompositeInstruction::new("program")
        .with(segment("from_start", &[0.0]))
        .with(CompositeInstruction::new("raster_1"))
        .with(segment("to_end", &[1.0]));
    assert_rejected(program, "segment 1 has no move instruction to continue from");
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn unknown_template_fails_construction() {
    let mut sections = config();
    sections.raster = section("Nope", "raster");
    let err = RasterMotionTask::new(
        "raster",
        PROGRAM_KEY,
        PLANNED_KEY,
        true,
        sections,
        registry(&PlannerLog::default()),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "raster: template 'Nope' is not registered");
}

#[test]
fn empty_keys_fail_construction() {
    let err = RasterMotionTask::new(
        "raster",
        "",
        PLANNED_KEY,
        true,
        config(),
        registry(&PlannerLog::default()),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "RasterMotionTask: missing 'inputs' entry");
}

#[test]
fn builds_from_json_config() {
    let mut document = serde_json::to_value(config()).expect("serialize");
    document["inputs"] = json!([PROGRAM_KEY]);
    document["outputs"] = json!(PLANNED_KEY);
    let task = RasterMotionTask::from_config(
        "raster",
        &document,
        registry(&PlannerLog::default()),
    )
    .expect("valid config");

    let node = TaskNode::from(task);
    assert!(node.info().is_conditional());
    assert_eq!(node.info().input_keys(), [PROGRAM_KEY]);
    assert_eq!(node.info().output_keys(), [PLANNED_KEY]);

    document["outputs"] = json!(["a", "b"]);
    let err = RasterMotionTask::from_config(
        "raster",
        &document,
        registry(&PlannerLog::default()),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "RasterMotionTask: 'outputs' entry currently only supports one key"
    );
}

#[test]
fn shared_instance_keys_are_rejected() {
    let mut sections = config();
    sections.raster = TemplateConfig::new("Planner");
    let task = raster_task(sections, registry(&PlannerLog::default()));

    let err = task
        .plan(&raster_program(2), &ManipulatorInfo::default())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "sub-graph instances 'Raster #1: raster_1' and 'Raster #2: raster_2' share the key 'input_data'"
    );

    let mut sections = config();
    sections.raster = TemplateConfig::new("Planner");
    assert_rejected_with(sections, raster_program(2));
}

#[test]
fn instances_may_not_write_the_task_keys() {
    let mut sections = config();
    sections.transition = TemplateConfig::new("Planner").remap_output("output_data", PLANNED_KEY);
    let task = raster_task(sections, registry(&PlannerLog::default()));

    let err = task
        .plan(&raster_program(2), &ManipulatorInfo::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RasterError::KeyCollision { ref key, ref first, .. }
            if key == PLANNED_KEY && first == "RasterMotionTask"
    ));
}

fn assert_rejected_with(sections: RasterConfig, program: CompositeInstruction) {
    let ctx = run(raster_task(sections, registry(&PlannerLog::default())), program, 1);
    assert_eq!(raster_record(&ctx).outcome(), FAILURE);
    assert_bus_untouched(&ctx);
}

// ═══════════════════════════════════════════════════════════════════════════════
// ABORT
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn aborted_sub_graph_fails_the_task() {
    let mut sections = config();
    sections.transition = section("Failing", "transition");
    let ctx = run(
        raster_task(sections, registry(&PlannerLog::default())),
        raster_program(3),
        2,
    );

    let record = raster_record(&ctx);
    assert_eq!(record.outcome(), FAILURE);
    assert_eq!(record.message(), SUBGRAPH_FAILED);
    assert!(ctx.is_aborted());
    assert!(!ctx.data().contains(PLANNED_KEY));
}

#[test]
fn registry_can_be_shared_between_tasks() {
    let log = PlannerLog::default();
    let registry = registry(&log);
    let first = raster_task(config(), Arc::clone(&registry));
    let second = raster_task(config(), registry);

    assert!(raster_record(&run(first, raster_program(1), 1)).is_success());
    assert!(raster_record(&run(second, raster_program(2), 1)).is_success());
    assert_eq!(log.calls().len(), 3 + 5);
}
