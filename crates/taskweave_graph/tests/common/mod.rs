#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use std::sync::Arc;

use parking_lot::Mutex;
use taskweave_graph::prelude::*;

// ═══════════════════════════════════════════════════════════════════════════════
// EXECUTION LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Names of the tasks that actually executed, in start order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: &str) {
        self.entries.lock().push(name.to_owned());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.entries.lock().iter().filter(|n| *n == name).count()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.lock().iter().position(|n| n == name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TASK HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// A task that logs its node name and reports `outcome`.
pub fn logging(log: &ExecutionLog, outcome: i32) -> impl Task {
    let log = log.clone();
    task_fn(move |cx| {
        log.push(cx.node().name());
        TaskOutcome::new(outcome, format!("{} done", cx.node().name()))
    })
}

/// Adds a non-conditional logging task that succeeds.
pub fn add_logged(graph: &mut Graph, log: &ExecutionLog, name: &str) -> NodeId {
    graph.add_task(name, logging(log, SUCCESS))
}

/// Adds a conditional logging task with a fixed outcome.
pub fn add_logged_conditional(
    graph: &mut Graph,
    log: &ExecutionLog,
    name: &str,
    outcome: i32,
) -> NodeId {
    graph.add_conditional_task(name, logging(log, outcome))
}

/// Runs `graph` on a fresh executor and waits for completion.
pub fn run(graph: Graph, workers: usize) -> ExecutionContext {
    let executor = Executor::new("test", workers).expect("executor");
    let ctx = ExecutionContext::new("test");
    executor
        .run_graph(graph, &ctx)
        .expect("valid graph")
        .wait();
    ctx
}

/// Record names in append order.
pub fn record_names(ctx: &ExecutionContext) -> Vec<String> {
    ctx.records().iter().map(|r| r.name().to_owned()).collect()
}
