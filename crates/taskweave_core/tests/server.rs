//! Integration tests for running registered tasks through a [`TaskServer`].

use std::sync::Arc;
use std::time::Duration;

use taskweave_core::prelude::*;
use taskweave_data::{CompositeInstruction, MoveInstruction, MoveKind, Waypoint};
use taskweave_graph::prelude::*;
use taskweave_nodes::prelude::*;

fn segment(description: &str, position: f64) -> CompositeInstruction {
    let state = Waypoint::new(vec!["joint_1".into()], vec![position]);
    CompositeInstruction::new(description)
        .with(MoveInstruction::new(description, MoveKind::Freespace, state))
}

fn copy_registry() -> Arc<TemplateRegistry> {
    let mut registry = TemplateRegistry::new();
    registry.register("Copy", |name| {
        TaskNode::new(
            name,
            task_fn(|cx| {
                let (Some(from), Some(to)) = (cx.input_key(0), cx.output_key(0)) else {
                    return TaskOutcome::failure("copy needs keys");
                };
                match cx.data().get(from) {
                    Some(value) => {
                        cx.data().set(to, value);
                        TaskOutcome::success("copied")
                    }
                    None => TaskOutcome::failure(format!("missing '{from}'")),
                }
            }),
        )
        .with_inputs(["input_data"])
        .with_outputs(["output_data"])
        .into()
    });
    Arc::new(registry)
}

fn pipeline() -> Graph {
    let indexed = |prefix: &str| {
        let (input, output) = (format!("{prefix}_in"), format!("{prefix}_out"));
        TemplateConfig::new("Copy")
            .remap_input("input_data", &input)
            .remap_output("output_data", &output)
            .index_inputs([input])
            .index_outputs([output])
    };
    let config = RasterConfig {
        freespace: indexed("freespace"),
        raster: indexed("raster"),
        transition: indexed("transition"),
    };
    let raster =
        RasterMotionTask::new("raster", "program", "planned", true, config, copy_registry())
            .expect("raster task");

    let mut graph = Graph::new("raster_pipeline");
    let check = graph.add_node(CheckInputTask::node("check", ["program"]));
    let failed = graph.add_task("report", task_fn(|_| TaskOutcome::failure("no program")));
    let raster = graph.add_node(raster);
    graph.add_conditional_edges(&check, &[failed, raster]);
    graph
}

fn server() -> TaskServer {
    let mut server = TaskServer::new();
    server
        .add_executor(Executor::new("default", 3).expect("executor"))
        .add_task(pipeline());
    server
}

#[test]
fn registered_pipeline_runs_by_name() {
    let server = server();
    let program = CompositeInstruction::new("program")
        .with(segment("from_start", 0.0))
        .with(segment("raster", 1.0))
        .with(segment("to_end", 2.0));
    let ctx = ExecutionContext::new("problem");
    ctx.data().set("program", program);

    let future = server.run("raster_pipeline", &ctx, "default").expect("run");

    assert_eq!(future.wait_for(Duration::from_secs(10)), FutureStatus::Ready);
    let last = ctx.last_record().expect("records");
    assert_eq!(last.name(), "raster_pipeline");
    assert!(last.is_success());
    assert_eq!(ctx.data().get_composite("planned").expect("planned").len(), 3);
    assert!(ctx.records().iter().all(|r| r.name() != "report"));
}

#[test]
fn missing_input_takes_the_failure_branch() {
    let server = server();
    let ctx = ExecutionContext::new("problem");

    server
        .run("raster_pipeline", &ctx, "default")
        .expect("run")
        .wait();

    let records = ctx.records();
    let names: Vec<&str> = records.iter().map(NodeRecord::name).collect();
    assert_eq!(names, ["check", "report", "raster_pipeline"]);
    assert_eq!(records[0].message(), "Missing input key: program");
}

#[test]
fn the_same_task_runs_on_independent_contexts() {
    let server = server();
    let contexts: Vec<ExecutionContext> = (0..4)
        .map(|i| ExecutionContext::new(format!("problem-{i}")))
        .collect();

    let futures: Vec<TaskFuture> = contexts
        .iter()
        .map(|ctx| server.run("raster_pipeline", ctx, "default").expect("run"))
        .collect();
    for future in &futures {
        future.wait();
    }

    for ctx in &contexts {
        assert_eq!(ctx.record_count(), 3);
        assert!(!ctx.is_aborted());
    }
}

#[test]
fn worker_and_task_counts_are_reported() {
    let server = server();
    assert_eq!(server.worker_count("default").expect("executor"), 3);
    assert_eq!(server.task_count("default").expect("executor"), 0);
    assert!(matches!(
        server.task_count("gpu"),
        Err(ServerError::UnknownExecutor(name)) if name == "gpu"
    ));
}

#[test]
fn unregistered_nodes_run_through_the_server() {
    let server = server();
    let ctx = ExecutionContext::new("adhoc");
    let node = Node::from(TaskNode::new("adhoc", task_fn(|_| TaskOutcome::success("done"))));

    server.run_node(node, &ctx, "default").expect("run").wait();

    assert_eq!(ctx.last_record().expect("record").message(), "done");
}

#[test]
fn invalid_graph_is_reported_by_the_server() {
    let server = server();
    let mut graph = Graph::new("cyclic");
    let a = graph.add_task("a", task_fn(|_| TaskOutcome::success("a")));
    let b = graph.add_task("b", task_fn(|_| TaskOutcome::success("b")));
    graph.add_edge(&a, &b).add_edge(&b, &a);

    let ctx = ExecutionContext::new("cyclic");
    let err = server.run_node(Node::from(graph), &ctx, "default").unwrap_err();

    assert!(matches!(err, ServerError::Execution(_)));
    assert!(err.to_string().starts_with("invalid graph"));
    assert_eq!(ctx.record_count(), 0);
}
