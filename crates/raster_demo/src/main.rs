//! Raster planning demo.
//!
//! Plans a four-raster program through a [`TaskServer`]: every raster,
//! transition and boundary segment is planned concurrently, then the
//! segments are stitched back into one program.
//!
//! # Usage
//!
//! ```bash
//! raster_demo [workers] [--json]
//! ```
//!
//! `RUST_LOG` overrides the default `info` filter.

mod planner;
mod program;

use std::process::ExitCode;
use std::sync::Arc;

use serde_json::json;
use taskweave_core::prelude::*;
use taskweave_data::{Instruction, ManipulatorInfo};
use taskweave_graph::prelude::*;
use taskweave_nodes::prelude::*;

const PROGRAM_KEY: &str = "program";
const PLANNED_KEY: &str = "planned_program";
const PIPELINE: &str = "RasterPipeline";
const EXECUTOR: &str = "default";

struct Options {
    workers: usize,
    format: TracingFormat,
}

fn parse_args() -> Option<Options> {
    let mut options = Options {
        workers: 4,
        format: TracingFormat::Pretty,
    };
    for arg in std::env::args().skip(1) {
        if arg == "--json" {
            options.format = TracingFormat::Json;
        } else {
            options.workers = arg.parse().ok().filter(|n| *n > 0)?;
        }
    }
    Some(options)
}

/// `CheckInput -> RasterMotionTask -> Done`, with `Error` on either failure.
fn pipeline(registry: Arc<TemplateRegistry>) -> Result<Graph, ConfigError> {
    let config = json!({
        "inputs": [PROGRAM_KEY],
        "outputs": [PLANNED_KEY],
        "freespace": {
            "task": "FreespacePlanner",
            "input_remapping": { "input_data": "freespace_input" },
            "output_remapping": { "output_data": "freespace_output" },
            "input_indexing": ["freespace_input"],
            "output_indexing": ["freespace_output"],
        },
        "raster": {
            "task": "RasterPlanner",
            "input_remapping": { "input_data": "raster_input" },
            "output_remapping": { "output_data": "raster_output" },
            "input_indexing": ["raster_input"],
            "output_indexing": ["raster_output"],
        },
        "transition": {
            "task": "FreespacePlanner",
            "input_remapping": { "input_data": "transition_input" },
            "output_remapping": { "output_data": "transition_output" },
            "input_indexing": ["transition_input"],
            "output_indexing": ["transition_output"],
        },
    });
    let raster = RasterMotionTask::from_config("RasterMotionTask", &config, registry)?;

    let mut graph = Graph::new(PIPELINE);
    let check = graph.add_node(CheckInputTask::node("CheckInput", [PROGRAM_KEY]));
    let raster = graph.add_node(raster);
    let error = graph.add_task("Error", task_fn(|_| TaskOutcome::failure("planning failed")));
    let done = graph.add_task("Done", task_fn(|_| TaskOutcome::success(SUCCESSFUL)));
    graph
        .add_conditional_edges(&check, &[error.clone(), raster.clone()])
        .add_conditional_edges(&raster, &[error.clone(), done.clone()])
        .set_terminals([error, done]);
    Ok(graph)
}

fn observers() -> Arc<Observers> {
    let observers = Observers::new();
    let registered = observers.register_for(
        "progress",
        &[EventKind::RunStarted, EventKind::RunCompleted],
        |event| tracing::debug!(?event, "run progress"),
    );
    if let Err(err) = registered {
        tracing::warn!(%err, "progress observer not registered");
    }
    Arc::new(observers)
}

fn run(options: &Options) -> Result<bool, Box<dyn core::error::Error>> {
    let mut server = TaskServer::new();
    server
        .add_executor(
            Executor::builder()
                .name(EXECUTOR)
                .workers(options.workers)
                .build()?,
        )
        .add_task(pipeline(planner::registry())?);

    let environment = Environment::new("raster_demo")
        .with_manipulator(ManipulatorInfo::new("manipulator", "base_link", "tool0"))
        .with_parameter(planner::STEPS_PARAMETER, json!(2));
    let ctx = ExecutionContext::builder("raster_demo")
        .environment(environment)
        .observers(observers())
        .build();
    ctx.data().set(PROGRAM_KEY, program::raster_example_program());

    server.run(PIPELINE, &ctx, EXECUTOR)?.wait();

    for record in ctx.records() {
        tracing::info!(
            node = %record.name(),
            outcome = record.outcome(),
            message = %record.message(),
            elapsed_us = record.elapsed().as_micros(),
            "record"
        );
    }

    let Some(last) = ctx.last_record() else {
        return Ok(false);
    };
    if !last.is_success() || ctx.is_aborted() {
        tracing::error!(message = %last.message(), "pipeline failed");
        return Ok(false);
    }

    let planned = ctx.data().get_composite(PLANNED_KEY)?;
    for segment in planned.iter().filter_map(Instruction::as_composite) {
        tracing::info!(
            segment = %segment.description,
            profile = %segment.profile,
            states = segment.move_count(),
            "planned segment"
        );
    }
    tracing::info!(
        segments = planned.len(),
        workers = server.worker_count(EXECUTOR)?,
        "raster program planned"
    );
    Ok(true)
}

fn main() -> ExitCode {
    let Some(options) = parse_args() else {
        eprintln!("Usage: raster_demo [workers] [--json]");
        return ExitCode::FAILURE;
    };

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    if let Err(err) = TracingConfig::new()
        .with_format(options.format)
        .with_env_filter(filter)
        .try_init()
    {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }

    match run(&options) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(%err, "raster demo failed");
            ExitCode::FAILURE
        }
    }
}
