//! Dynamic raster sub-graph builder.
//!
//! A raster program is a composite of composites laid out as
//! `from_start, raster, transition, raster, ..., raster, to_end`.
//! [`RasterMotionTask`] plans every segment concurrently: it expands the
//! program into a sub-graph of template instances, runs that graph on the
//! executor it was handed, and stitches the outputs back into one program.
//!
//! ```text
//!                      ┌─► Raster #1 ──┬─► UpdateEndState ──► From Start
//!                      │               ▼
//!   StartTask ─────────┼─► Raster #2   UpdateStartAndEndState ──► Transition #1
//!                      │      │        ▲
//!                      │      └────────┘
//!                      └─► Raster #n ────► UpdateStartState ──► To End
//! ```
//!
//! Every instance gets its own keys through the template's remapping and
//! indexing, and the plan rejects instances that would share one. The whole
//! plan is built before the first bus write, so a malformed program leaves
//! the bus exactly as it was.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use taskweave_data::{CompositeInstruction, DataBus, DataError, Instruction, ManipulatorInfo};
use taskweave_graph::graph::Graph;
use taskweave_graph::node::{Node, NodeId, TaskNode};
use taskweave_graph::task::{Task, TaskContext, TaskOutcome};

use crate::config::{RasterConfig, TemplateConfig};
use crate::error::{ConfigError, RasterError};
use crate::registry::{TemplateInstance, TemplateRegistry};
use crate::tasks::{
    SUCCESSFUL, StartTask, UpdateEndStateTask, UpdateStartAndEndStateTask, UpdateStartStateTask,
};

/// Message reported when the nested run was aborted.
pub const SUBGRAPH_FAILED: &str = "Raster subgraph failed";

/// Freespace instance index of the approach segment.
const FROM_START_INDEX: usize = 1;

/// Freespace instance index of the departure segment.
const TO_END_INDEX: usize = 2;

// ─────────────────────────────────────────────────────────────────────────────
// RasterMotionTask
// ─────────────────────────────────────────────────────────────────────────────

/// Plans a raster program by expanding it into a sub-graph at run time.
///
/// The task needs an executor: it is only useful inside a graph run, where
/// [`TaskContext::executor`] is set.
#[derive(Debug, Clone)]
pub struct RasterMotionTask {
    name: String,
    input_key: String,
    output_key: String,
    conditional: bool,
    config: RasterConfig,
    registry: Arc<TemplateRegistry>,
}

impl RasterMotionTask {
    /// Creates the task.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingField`] for an empty input or output key
    /// - [`ConfigError::UnknownTemplate`] if one of the three sections names
    ///   a template `registry` does not have
    pub fn new(
        name: impl Into<String>,
        input_key: impl Into<String>,
        output_key: impl Into<String>,
        conditional: bool,
        config: RasterConfig,
        registry: Arc<TemplateRegistry>,
    ) -> Result<Self, ConfigError> {
        let input_key = input_key.into();
        let output_key = output_key.into();
        if input_key.is_empty() {
            return Err(ConfigError::missing_field(RasterConfig::ENTRY, "inputs"));
        }
        if output_key.is_empty() {
            return Err(ConfigError::missing_field(RasterConfig::ENTRY, "outputs"));
        }
        for (entry, section) in config.sections() {
            if !registry.has(&section.task) {
                return Err(ConfigError::unknown_template(entry, &section.task));
            }
        }

        Ok(Self {
            name: name.into(),
            input_key,
            output_key,
            conditional,
            config,
            registry,
        })
    }

    /// Creates the task from a JSON object.
    ///
    /// Besides the three template sections, the object carries `inputs` and
    /// `outputs` (a key or a one-element list) and an optional `conditional`
    /// flag, which defaults to `true`.
    ///
    /// # Errors
    ///
    /// See [`RasterConfig::from_value`] and [`new`](Self::new). A key list
    /// with more than one entry gives [`ConfigError::TooManyKeys`].
    pub fn from_config(
        name: impl Into<String>,
        config: &serde_json::Value,
        registry: Arc<TemplateRegistry>,
    ) -> Result<Self, ConfigError> {
        let input_key = single_key(config, "inputs")?;
        let output_key = single_key(config, "outputs")?;
        let conditional = config
            .get("conditional")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true);
        let sections = RasterConfig::from_value(config)?;
        Self::new(name, input_key, output_key, conditional, sections, registry)
    }

    /// Node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template sections.
    #[must_use]
    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Expands `program` without touching any bus.
    ///
    /// `environment` is the manipulator the run's environment supplies; it
    /// fills whatever the program and its segments leave empty.
    ///
    /// # Errors
    ///
    /// Any [`RasterError`] describing why the program cannot be expanded.
    pub fn plan(
        &self,
        program: &CompositeInstruction,
        environment: &ManipulatorInfo,
    ) -> Result<RasterPlan, RasterError> {
        self.plan_with_keys(
            program,
            environment,
            [self.input_key.as_str(), self.output_key.as_str()],
        )
    }

    fn plan_with_keys(
        &self,
        program: &CompositeInstruction,
        environment: &ManipulatorInfo,
        reserved: [&str; 2],
    ) -> Result<RasterPlan, RasterError> {
        let segments = segments(program)?;
        let len = segments.len();
        for (index, segment) in segments.iter().enumerate().take(len - 1) {
            if segment.last_move().is_none() {
                return Err(RasterError::MissingMove { index });
            }
        }

        let manipulator = program
            .manipulator
            .clone()
            .unwrap_or_default()
            .combined(environment);
        let prepare = |index: usize| -> CompositeInstruction {
            let mut segment = segments[index].clone();
            segment.manipulator = Some(
                segment
                    .manipulator
                    .clone()
                    .unwrap_or_default()
                    .combined(&manipulator),
            );
            // The previous segment's last move anchors this one.
            if let Some(anchor) = index.checked_sub(1).and_then(|i| segments[i].last_move()) {
                segment.insert(0, anchor.clone());
            }
            segment
        };

        let mut builder = PlanBuilder::new(self, reserved);
        let start = builder.graph.add_node(StartTask::node());

        let mut rasters: Vec<(NodeId, String)> = Vec::new();
        for (k, index) in (1..len - 1).step_by(2).enumerate() {
            let input = prepare(index);
            let name = format!("Raster #{}: {}", k + 1, input.description);
            let instance = builder.instance(&self.config.raster, &name, k + 1)?;
            builder.seed(&instance.input_key, input);
            let output = instance.output_key.clone();
            let id = builder.graph.add_node(instance.node);
            builder.graph.add_edge(&start, &id);
            builder.rasters.push(output.clone());
            rasters.push((id, output));
        }

        let transitions = rasters.windows(2).zip((2..len - 2).step_by(2));
        for (k, (pair, index)) in transitions.enumerate() {
            let [(previous, previous_output), (next, next_output)] = pair else {
                continue;
            };
            let template = prepare(index);
            let name = format!("Transition #{}: {}", k + 1, template.description);
            let instance = builder.instance(&self.config.transition, &name, k + 1)?;
            let mux = UpdateStartAndEndStateTask::node(
                previous_output,
                next_output,
                &instance.input_key,
            );
            builder.seed(mux.info().id().as_str(), template);
            builder.transitions.push(instance.output_key.clone());

            let transition = builder.graph.add_node(instance.node);
            let mux = builder.graph.add_node(mux);
            builder
                .graph
                .add_edge(&mux, &transition)
                .add_edge(previous, &mux)
                .add_edge(next, &mux);
        }

        let (Some((first, first_output)), Some((last, last_output))) =
            (rasters.first(), rasters.last())
        else {
            return Err(RasterError::Shape { len });
        };

        let template = prepare(0);
        let name = format!("From Start: {}", template.description);
        let instance = builder.instance(&self.config.freespace, &name, FROM_START_INDEX)?;
        let update = UpdateEndStateTask::node(first_output, &instance.input_key);
        builder.seed(update.info().id().as_str(), template);
        builder.from_start = instance.output_key.clone();
        let from_start = builder.graph.add_node(instance.node);
        let update = builder.graph.add_node(update);
        builder
            .graph
            .add_edge(&update, &from_start)
            .add_edge(first, &update);

        let template = prepare(len - 1);
        let name = format!("To End: {}", template.description);
        let instance = builder.instance(&self.config.freespace, &name, TO_END_INDEX)?;
        let update = UpdateStartStateTask::node(last_output, &instance.input_key);
        builder.seed(update.info().id().as_str(), template);
        builder.to_end = instance.output_key.clone();
        let to_end = builder.graph.add_node(instance.node);
        let update = builder.graph.add_node(update);
        builder
            .graph
            .add_edge(&update, &to_end)
            .add_edge(last, &update);

        Ok(builder.finish(program))
    }

    fn fail(cx: &TaskContext<'_>, message: impl Into<String>) -> TaskOutcome {
        let message = message.into();
        tracing::error!(node = %cx.node().name(), %message, "raster planning failed");
        TaskOutcome::failure(message)
    }
}

impl Task for RasterMotionTask {
    fn run(&self, cx: &TaskContext<'_>) -> TaskOutcome {
        let (Some(input_key), Some(output_key)) = (cx.input_key(0), cx.output_key(0)) else {
            return Self::fail(cx, "RasterMotionTask needs one input key and one output key");
        };
        let program = match cx.data().get_composite(input_key) {
            Ok(program) => program,
            Err(DataError::Missing { .. }) => {
                return Self::fail(cx, RasterError::MissingInput.to_string());
            }
            Err(DataError::TypeMismatch { .. }) => {
                return Self::fail(cx, RasterError::NotComposite.to_string());
            }
        };
        let plan = match self.plan_with_keys(
            &program,
            cx.environment().manipulator(),
            [input_key, output_key],
        ) {
            Ok(plan) => plan,
            Err(err) => return Self::fail(cx, err.to_string()),
        };
        let Some(executor) = cx.executor() else {
            return Self::fail(cx, "RasterMotionTask requires an executor");
        };

        tracing::debug!(
            node = %cx.node().name(),
            rasters = plan.raster_count(),
            transitions = plan.transition_count(),
            "running raster sub-graph"
        );
        plan.seed(cx.data());
        match executor.run_graph(plan.graph(), cx.context()) {
            Ok(future) => future.wait(),
            Err(err) => return Self::fail(cx, RasterError::from(err).to_string()),
        }

        if cx.context().is_aborted() {
            return Self::fail(cx, SUBGRAPH_FAILED);
        }
        match plan.assemble(cx.data()) {
            Ok(result) => {
                cx.data().set(output_key, result);
                TaskOutcome::success(SUCCESSFUL)
            }
            Err(err) => Self::fail(cx, err.to_string()),
        }
    }
}

impl From<RasterMotionTask> for TaskNode {
    fn from(task: RasterMotionTask) -> Self {
        let name = task.name.clone();
        let input = task.input_key.clone();
        let output = task.output_key.clone();
        let conditional = task.conditional;
        TaskNode::new(name, task)
            .with_inputs([input])
            .with_outputs([output])
            .conditional(conditional)
    }
}

impl From<RasterMotionTask> for Node {
    fn from(task: RasterMotionTask) -> Self {
        Node::Task(task.into())
    }
}

fn single_key(config: &serde_json::Value, field: &str) -> Result<String, ConfigError> {
    let value = config
        .get(field)
        .ok_or_else(|| ConfigError::missing_field(RasterConfig::ENTRY, field))?;
    let keys: Vec<String> = match value {
        serde_json::Value::String(key) => vec![key.clone()],
        other => serde_json::from_value(other.clone()).map_err(|source| ConfigError::Parse {
            entry: format!("{}.{field}", RasterConfig::ENTRY),
            source,
        })?,
    };
    match keys.as_slice() {
        [] => Err(ConfigError::missing_field(RasterConfig::ENTRY, field)),
        [key] => Ok(key.clone()),
        _ => Err(ConfigError::TooManyKeys {
            entry: RasterConfig::ENTRY.to_owned(),
            field: field.to_owned(),
        }),
    }
}

fn segments(program: &CompositeInstruction) -> Result<Vec<&CompositeInstruction>, RasterError> {
    let len = program.len();
    if len < 3 || len % 2 == 0 {
        return Err(RasterError::Shape { len });
    }
    program
        .iter()
        .enumerate()
        .map(|(index, instruction)| {
            instruction.as_composite().ok_or(match index {
                0 => RasterError::FromStartNotComposite,
                i if i == len - 1 => RasterError::ToEndNotComposite,
                i => RasterError::SegmentNotComposite { index: i },
            })
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// RasterPlan
// ─────────────────────────────────────────────────────────────────────────────

/// A fully expanded raster program, ready to run.
#[derive(Debug, Clone)]
pub struct RasterPlan {
    graph: Arc<Graph>,
    seeds: Vec<(String, CompositeInstruction)>,
    shell: CompositeInstruction,
    from_start: String,
    rasters: Vec<String>,
    transitions: Vec<String>,
    to_end: String,
}

impl RasterPlan {
    /// The generated sub-graph.
    #[must_use]
    pub fn graph(&self) -> Arc<Graph> {
        Arc::clone(&self.graph)
    }

    /// Bus entries written before the sub-graph starts, in write order.
    #[must_use]
    pub fn seeds(&self) -> &[(String, CompositeInstruction)] {
        &self.seeds
    }

    /// Number of raster segments.
    #[must_use]
    pub fn raster_count(&self) -> usize {
        self.rasters.len()
    }

    /// Number of transition segments.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Output keys in program order.
    pub fn output_keys(&self) -> impl Iterator<Item = &str> {
        let mut middle = Vec::with_capacity(self.rasters.len() + self.transitions.len());
        for (i, raster) in self.rasters.iter().enumerate() {
            middle.push(raster.as_str());
            if let Some(transition) = self.transitions.get(i) {
                middle.push(transition.as_str());
            }
        }
        core::iter::once(self.from_start.as_str())
            .chain(middle)
            .chain(core::iter::once(self.to_end.as_str()))
    }

    /// Writes every seed to `bus`.
    pub fn seed(&self, bus: &DataBus) {
        for (key, value) in &self.seeds {
            bus.set(key.as_str(), value.clone());
        }
    }

    /// Rebuilds the planned program from the sub-graph's outputs.
    ///
    /// The approach segment is taken as is. Every later segment drops its
    /// first element, the anchor it was seeded with.
    ///
    /// # Errors
    ///
    /// [`RasterError::MissingOutput`] if an output key does not hold a
    /// composite.
    pub fn assemble(&self, bus: &DataBus) -> Result<CompositeInstruction, RasterError> {
        let mut program = self.shell.clone();
        for (position, key) in self.output_keys().enumerate() {
            let mut segment = bus
                .get_composite(key)
                .map_err(|_| RasterError::MissingOutput { key: key.to_owned() })?;
            if position > 0 {
                segment.remove(0);
            }
            program.push(Instruction::Composite(segment));
        }
        Ok(program)
    }
}

struct PlanBuilder<'a> {
    registry: &'a TemplateRegistry,
    graph: Graph,
    claims: KeyClaims,
    seeds: Vec<(String, CompositeInstruction)>,
    from_start: String,
    rasters: Vec<String>,
    transitions: Vec<String>,
    to_end: String,
}

impl<'a> PlanBuilder<'a> {
    fn new(task: &'a RasterMotionTask, reserved: [&str; 2]) -> Self {
        let mut claims = KeyClaims::default();
        for key in reserved {
            claims.writes.insert(key.to_owned(), task.name.clone());
        }
        Self {
            registry: &task.registry,
            graph: Graph::new(format!("{} sub-graph", task.name)),
            claims,
            seeds: Vec::new(),
            from_start: String::new(),
            rasters: Vec::new(),
            transitions: Vec::new(),
            to_end: String::new(),
        }
    }

    fn instance(
        &mut self,
        config: &TemplateConfig,
        name: &str,
        index: usize,
    ) -> Result<TemplateInstance, RasterError> {
        let instance = self.registry.create_task(config, name, index)?;
        self.claims.claim(&instance)?;
        Ok(instance)
    }

    fn seed(&mut self, key: &str, value: CompositeInstruction) {
        self.seeds.push((key.to_owned(), value));
    }

    fn finish(self, program: &CompositeInstruction) -> RasterPlan {
        let mut shell = program.clone();
        shell.clear();
        RasterPlan {
            graph: Arc::new(self.graph),
            seeds: self.seeds,
            shell,
            from_start: self.from_start,
            rasters: self.rasters,
            transitions: self.transitions,
            to_end: self.to_end,
        }
    }
}

/// Bus keys claimed by the instances planned so far.
///
/// An instance owns its primary input and every output of its node and of
/// any node nested in it. Owned keys may not be owned or read by anyone else,
/// while secondary inputs that nobody writes can be shared.
#[derive(Default)]
struct KeyClaims {
    writes: IndexMap<String, String>,
    reads: IndexMap<String, String>,
}

impl KeyClaims {
    fn claim(&mut self, instance: &TemplateInstance) -> Result<(), RasterError> {
        let name = instance.node.name();
        let headers = instance.node.headers();
        let mut owned: IndexSet<&String> = IndexSet::new();
        owned.insert(&instance.input_key);
        owned.extend(headers.iter().flat_map(|info| info.output_keys()));
        let read: IndexSet<&String> = headers
            .iter()
            .flat_map(|info| info.input_keys())
            .collect();

        let collision = |key: &String, first: &String| RasterError::KeyCollision {
            key: key.clone(),
            first: first.clone(),
            second: name.to_owned(),
        };
        for &key in &owned {
            if let Some(first) = self.writes.get(key).or_else(|| self.reads.get(key)) {
                return Err(collision(key, first));
            }
        }
        for &key in &read {
            if let Some(first) = self.writes.get(key) {
                return Err(collision(key, first));
            }
        }

        for key in owned {
            self.writes.insert(key.clone(), name.to_owned());
        }
        for key in read {
            self.reads
                .entry(key.clone())
                .or_insert_with(|| name.to_owned());
        }
        Ok(())
    }
}
