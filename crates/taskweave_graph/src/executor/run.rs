//! Per-run scheduling state.
//!
//! One [`GraphRun`] exists per scheduled graph. It tracks, for every child:
//!
//! - how many distinct predecessors have not resolved yet
//! - whether any resolved predecessor routed into it
//! - whether any predecessor was aborted
//!
//! When the last predecessor of a child resolves the child is dispatched to
//! run, dispatched to be recorded as aborted, or pruned. Pruning cascades
//! without touching a worker, so every child resolves exactly once and the
//! run always drains.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::context::ExecutionContext;
use crate::executor::Executor;
use crate::future::{Completion, TaskFuture};
use crate::graph::{Graph, Topology};
use crate::hooks::ExecutionEvent;
use crate::node::NodeId;
use crate::task::TaskOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Ran(i32),
    Aborted,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Run,
    Abort,
}

struct Progress {
    pending: Vec<usize>,
    activated: Vec<bool>,
    poisoned: Vec<bool>,
    resolutions: Vec<Option<Resolution>>,
    remaining: usize,
}

pub(crate) struct GraphRun {
    graph: Arc<Graph>,
    topology: Topology,
    ctx: ExecutionContext,
    executor: Executor,
    progress: Mutex<Progress>,
    completion: Arc<Completion>,
    started: Instant,
}

impl GraphRun {
    /// Schedules every source of `graph`. The graph must be valid.
    pub(crate) fn launch(
        graph: Arc<Graph>,
        ctx: &ExecutionContext,
        executor: &Executor,
    ) -> Arc<Self> {
        let topology = graph.topology();
        let count = graph.node_count();
        let run = Arc::new(Self {
            progress: Mutex::new(Progress {
                pending: topology.predecessors.clone(),
                activated: vec![false; count],
                poisoned: vec![false; count],
                resolutions: vec![None; count],
                remaining: count,
            }),
            topology,
            ctx: ctx.clone(),
            executor: executor.clone(),
            completion: Completion::new(executor.pool()),
            started: Instant::now(),
            graph,
        });

        tracing::info!(graph = %run.graph.name(), nodes = count, "run started");
        run.ctx.notify(&ExecutionEvent::RunStarted {
            graph: run.graph.name().to_owned(),
            node_count: count,
        });

        if count == 0 {
            run.finish();
            return run;
        }

        let sources: Vec<usize> = (0..count)
            .filter(|&index| run.topology.predecessors[index] == 0)
            .collect();
        {
            // Every source is queued before any of them can resolve, so a
            // fast source never queues its successors ahead of a later source.
            let _progress = run.progress.lock();
            for index in sources {
                run.dispatch(index, Dispatch::Run);
            }
        }
        run
    }

    pub(crate) fn future(self: &Arc<Self>) -> TaskFuture {
        let retained: Arc<dyn core::any::Any + Send + Sync> = Arc::<Self>::clone(self);
        TaskFuture::new(Arc::clone(&self.completion), retained)
    }

    /// Outcome of the graph seen as a single node. Call after completion.
    pub(crate) fn outcome(&self) -> TaskOutcome {
        if self.ctx.is_aborted() {
            return TaskOutcome::failure(format!("Graph '{}' aborted", self.graph.name()));
        }
        let terminals = self.graph.terminals();
        if terminals.is_empty() {
            return TaskOutcome::success("Successful");
        }

        let progress = self.progress.lock();
        let reached = terminals.iter().enumerate().find(|(_, id)| {
            self.graph
                .position(id)
                .and_then(|index| progress.resolutions[index])
                .is_some_and(|resolution| matches!(resolution, Resolution::Ran(_)))
        });
        match reached {
            Some((position, id)) => TaskOutcome::new(
                i32::try_from(position).unwrap_or(i32::MAX),
                format!("Reached terminal '{}'", self.graph_name_of(id)),
            ),
            None => TaskOutcome::failure("no terminal reached"),
        }
    }

    fn graph_name_of(&self, id: &NodeId) -> &str {
        self.graph.node(id).map_or("", |node| node.name())
    }

    fn dispatch(self: &Arc<Self>, index: usize, dispatch: Dispatch) {
        let run = Arc::clone(self);
        tracing::trace!(
            graph = %self.graph.name(),
            node = %self.graph.nodes()[index].name(),
            ?dispatch,
            "dispatch"
        );
        self.executor
            .submit(Box::new(move || run.execute(index, dispatch)));
    }

    fn execute(self: &Arc<Self>, index: usize, dispatch: Dispatch) {
        let node = &self.graph.nodes()[index];
        let resolution = match dispatch {
            Dispatch::Abort => {
                node.record_aborted(&self.ctx);
                Resolution::Aborted
            }
            Dispatch::Run => {
                let execution = node.run(&self.ctx, Some(&self.executor));
                if execution.aborted {
                    Resolution::Aborted
                } else {
                    Resolution::Ran(execution.record.outcome())
                }
            }
        };
        self.resolve(index, resolution);
    }

    fn resolve(self: &Arc<Self>, index: usize, resolution: Resolution) {
        let mut ready = Vec::new();
        let mut skipped = Vec::new();
        let finished = {
            let mut progress = self.progress.lock();
            let mut worklist = vec![(index, resolution)];

            while let Some((current, resolution)) = worklist.pop() {
                progress.resolutions[current] = Some(resolution);
                progress.remaining -= 1;

                let selected: &[usize] = match resolution {
                    Resolution::Ran(outcome) => self.topology.selected(current, outcome),
                    Resolution::Aborted | Resolution::Skipped => &[],
                };

                for &succ in &self.topology.successors[current] {
                    progress.pending[succ] -= 1;
                    if resolution == Resolution::Aborted {
                        progress.poisoned[succ] = true;
                    }
                    if selected.contains(&succ) {
                        progress.activated[succ] = true;
                    }
                    if progress.pending[succ] > 0 {
                        continue;
                    }

                    // Any aborted predecessor forces the join to abort.
                    if progress.poisoned[succ] || self.ctx.is_aborted() {
                        ready.push((succ, Dispatch::Abort));
                    } else if progress.activated[succ] {
                        ready.push((succ, Dispatch::Run));
                    } else {
                        skipped.push(succ);
                        worklist.push((succ, Resolution::Skipped));
                    }
                }
            }
            progress.remaining == 0
        };

        for succ in skipped {
            let node = &self.graph.nodes()[succ];
            tracing::debug!(node = %node.name(), "node skipped");
            self.ctx.notify(&ExecutionEvent::NodeSkipped {
                node_id: node.id().clone(),
                name: node.name().to_owned(),
            });
        }
        for (succ, dispatch) in ready {
            self.dispatch(succ, dispatch);
        }
        if finished {
            self.finish();
        }
    }

    fn finish(&self) {
        let duration = self.started.elapsed();
        tracing::info!(
            graph = %self.graph.name(),
            elapsed_ms = duration.as_millis() as u64,
            aborted = self.ctx.is_aborted(),
            "run complete"
        );
        self.ctx.notify(&ExecutionEvent::RunCompleted {
            graph: self.graph.name().to_owned(),
            duration,
        });
        self.completion.complete();
    }
}

/// Runs a nested graph node to completion on `executor`.
pub(crate) fn execute_graph_node(
    graph: &Arc<Graph>,
    ctx: &ExecutionContext,
    executor: Option<&Executor>,
) -> TaskOutcome {
    let Some(executor) = executor else {
        return TaskOutcome::failure("graph requires an executor");
    };
    if let Err(errors) = graph.validate() {
        let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return TaskOutcome::failure(format!("invalid graph: {}", reasons.join("; ")));
    }
    let run = GraphRun::launch(Arc::clone(graph), ctx, executor);
    run.future().wait();
    run.outcome()
}
