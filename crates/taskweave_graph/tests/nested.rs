//! Integration tests for graphs nested inside graphs.
//!
//! Nested runs share the parent's executor. A worker blocked on a nested
//! run keeps executing queued jobs, so these tests run on a single worker
//! on purpose.

mod common;

use std::time::Duration;

use common::{ExecutionLog, add_logged, add_logged_conditional, record_names};
use taskweave_graph::prelude::*;

fn inner_graph(log: &ExecutionLog, name: &str) -> Graph {
    let mut graph = Graph::new(name);
    let first = add_logged(&mut graph, log, &format!("{name}.first"));
    let second = add_logged(&mut graph, log, &format!("{name}.second"));
    graph.add_edge(&first, &second);
    graph
}

#[test]
fn nested_graph_runs_on_a_single_worker() {
    let log = ExecutionLog::new();
    let mut outer = Graph::new("outer");
    let before = add_logged(&mut outer, &log, "before");
    let inner = outer.add_node(inner_graph(&log, "inner"));
    let after = add_logged(&mut outer, &log, "after");
    outer.add_edge(&before, &inner);
    outer.add_edge(&inner, &after);

    let executor = Executor::new("nested", 1).expect("executor");
    let ctx = ExecutionContext::new("nested");
    let future = executor.run_graph(outer, &ctx).expect("valid");

    assert_eq!(future.wait_for(Duration::from_secs(5)), FutureStatus::Ready);
    assert_eq!(
        log.entries(),
        ["before", "inner.first", "inner.second", "after"]
    );
    // Children append before the graph node itself.
    assert_eq!(
        record_names(&ctx),
        ["before", "inner.first", "inner.second", "inner", "after"]
    );
    let inner_record = ctx.record_for(&inner).expect("inner record");
    assert_eq!(inner_record.outcome(), SUCCESS);
    assert_eq!(inner_record.message(), "Successful");
}

#[test]
fn deeply_nested_graphs_complete() {
    let log = ExecutionLog::new();
    let mut graph = inner_graph(&log, "level0");
    for depth in 1..=4 {
        let mut wrapper = Graph::new(format!("level{depth}"));
        let child = wrapper.add_node(graph);
        let tail = add_logged(&mut wrapper, &log, &format!("level{depth}.tail"));
        wrapper.add_edge(&child, &tail);
        graph = wrapper;
    }

    let executor = Executor::new("deep", 1).expect("executor");
    let ctx = ExecutionContext::new("deep");
    let future = executor.run_graph(graph, &ctx).expect("valid");

    assert_eq!(future.wait_for(Duration::from_secs(5)), FutureStatus::Ready);
    assert_eq!(log.count("level0.second"), 1);
    assert_eq!(log.entries().last().map(String::as_str), Some("level4.tail"));
}

#[test]
fn terminals_decide_the_nested_outcome() {
    for branch in [FAILURE, SUCCESS] {
        let log = ExecutionLog::new();
        let mut inner = Graph::new("decide");
        let check = add_logged_conditional(&mut inner, &log, "check", branch);
        let rejected = add_logged(&mut inner, &log, "rejected");
        let accepted = add_logged(&mut inner, &log, "accepted");
        inner.add_conditional_edges(&check, &[rejected.clone(), accepted.clone()]);
        inner.set_terminals([rejected, accepted]);
        let inner = inner.conditional(true);

        let mut outer = Graph::new("outer");
        let decide = outer.add_node(inner);
        let on_rejected = add_logged(&mut outer, &log, "on_rejected");
        let on_accepted = add_logged(&mut outer, &log, "on_accepted");
        outer.add_conditional_edges(&decide, &[on_rejected, on_accepted]);

        let executor = Executor::new("terminals", 1).expect("executor");
        let ctx = ExecutionContext::new("terminals");
        executor.run_graph(outer, &ctx).expect("valid").wait();

        let record = ctx.record_for(&decide).expect("decide record");
        assert_eq!(record.outcome(), branch);
        let expected = if branch == SUCCESS {
            "on_accepted"
        } else {
            "on_rejected"
        };
        assert_eq!(log.entries().last().map(String::as_str), Some(expected));
    }
}

#[test]
fn unreached_terminals_report_failure() {
    let log = ExecutionLog::new();
    let mut inner = Graph::new("unreached");
    let check = add_logged_conditional(&mut inner, &log, "check", FAILURE);
    let target = add_logged(&mut inner, &log, "target");
    inner.add_edge_on(&check, SUCCESS, &target);
    inner.set_terminals([target]);

    let executor = Executor::new("unreached", 1).expect("executor");
    let ctx = ExecutionContext::new("unreached");
    let future = executor
        .run_node(Node::from(inner), &ctx)
        .expect("valid");
    future.wait();

    let record = ctx.last_record().expect("graph record");
    assert_eq!(record.name(), "unreached");
    assert_eq!(record.outcome(), FAILURE);
    assert_eq!(record.message(), "no terminal reached");
}

/// A task that builds and runs its own sub-graph through the executor handed
/// to it, then reports the sub-graph's outcome.
struct Expand {
    width: usize,
}

impl Task for Expand {
    fn run(&self, cx: &TaskContext<'_>) -> TaskOutcome {
        let Some(executor) = cx.executor() else {
            return TaskOutcome::failure("no executor");
        };
        let mut graph = Graph::new("expanded");
        let root = graph.add_task("root", task_fn(|_| TaskOutcome::success("root")));
        for i in 0..self.width {
            let leaf = graph.add_task(
                format!("leaf{i}"),
                task_fn(move |cx| {
                    cx.data().set(format!("leaf{i}"), serde_json::json!(i));
                    TaskOutcome::success("leaf")
                }),
            );
            graph.add_edge(&root, &leaf);
        }
        match executor.run_graph(graph, cx.context()) {
            Ok(future) => future.wait(),
            Err(err) => return TaskOutcome::failure(err.to_string()),
        }
        if cx.context().is_aborted() {
            TaskOutcome::failure("expanded graph aborted")
        } else {
            TaskOutcome::success("expanded")
        }
    }
}

#[test]
fn task_can_schedule_a_sub_graph_on_its_executor() {
    for workers in [1, 3] {
        let mut graph = Graph::new("dynamic");
        let expand = graph.add_node(TaskNode::new("expand", Expand { width: 5 }));
        let check = graph.add_task(
            "check",
            task_fn(|cx| {
                let found = (0..5)
                    .filter(|i| cx.data().contains(&format!("leaf{i}")))
                    .count();
                TaskOutcome::new(i32::try_from(found).unwrap_or(-1), "counted")
            }),
        );
        graph.add_edge(&expand, &check);

        let executor = Executor::new("dynamic", workers).expect("executor");
        let ctx = ExecutionContext::new("dynamic");
        let future = executor.run_graph(graph, &ctx).expect("valid");

        assert_eq!(future.wait_for(Duration::from_secs(5)), FutureStatus::Ready);
        assert_eq!(ctx.record_for(&expand).expect("expand").message(), "expanded");
        assert_eq!(ctx.record_for(&check).expect("check").outcome(), 5);
        // root + 5 leaves + expand + check
        assert_eq!(ctx.record_count(), 8);
    }
}

#[test]
fn invalid_nested_graph_fails_its_node() {
    let mut outer = Graph::new("outer");
    let empty = outer.add_node(Graph::new("empty"));

    let executor = Executor::new("invalid", 1).expect("executor");
    let ctx = ExecutionContext::new("invalid");
    executor.run_graph(outer, &ctx).expect("outer is valid").wait();

    let record = ctx.record_for(&empty).expect("record");
    assert_eq!(record.outcome(), FAILURE);
    assert!(record.message().starts_with("invalid graph"));
}
