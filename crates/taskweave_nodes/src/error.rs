//! Error types for template construction and raster planning.

use taskweave_graph::executor::ExecutionError;
use thiserror::Error;

/// Errors raised while building nodes from configuration.
///
/// These are construction-time failures: they surface before anything is
/// scheduled.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required entry or field is absent.
    #[error("{entry}: missing '{field}' entry")]
    MissingField {
        /// The config section being read.
        entry: String,
        /// The absent field.
        field: String,
    },

    /// A config section could not be deserialized.
    #[error("{entry}: {source}")]
    Parse {
        /// The config section being read.
        entry: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A config section names a template the registry does not know.
    #[error("{entry}: template '{template}' is not registered")]
    UnknownTemplate {
        /// The config section being read.
        entry: String,
        /// The unknown template name.
        template: String,
    },

    /// A key list holds more entries than the node supports.
    #[error("{entry}: '{field}' entry currently only supports one key")]
    TooManyKeys {
        /// The config section being read.
        entry: String,
        /// The key list field.
        field: String,
    },

    /// A template produced a node without the keys an instance needs.
    #[error("node '{node}' has no {direction} keys")]
    MissingKeys {
        /// Name of the instantiated node.
        node: String,
        /// `"input"` or `"output"`.
        direction: &'static str,
    },
}

impl ConfigError {
    /// Creates a [`MissingField`](Self::MissingField).
    pub fn missing_field(entry: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            entry: entry.into(),
            field: field.into(),
        }
    }

    /// Creates an [`UnknownTemplate`](Self::UnknownTemplate).
    pub fn unknown_template(entry: impl Into<String>, template: impl Into<String>) -> Self {
        Self::UnknownTemplate {
            entry: entry.into(),
            template: template.into(),
        }
    }
}

/// Reasons a raster program cannot be expanded into a sub-graph.
///
/// Each one is reported as outcome `0` with the error's message, and none of
/// them writes to the bus.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The input key holds nothing.
    #[error("Input instructions to RasterMotionTask are missing")]
    MissingInput,

    /// The input key holds something other than a composite.
    #[error("Input instructions to RasterMotionTask are not a composite instruction")]
    NotComposite,

    /// The program does not have the `from_start, (raster, transition)*,
    /// raster, to_end` shape.
    #[error(
        "program must alternate from_start, rasters, transitions and to_end \
         (odd length of at least 3, got {len})"
    )]
    Shape {
        /// Number of direct children found.
        len: usize,
    },

    /// The first element is not a composite.
    #[error("from_start should be a composite")]
    FromStartNotComposite,

    /// A middle element is not a composite.
    #[error("Both rasters and transitions should be a composite")]
    SegmentNotComposite {
        /// Position in the program.
        index: usize,
    },

    /// The last element is not a composite.
    #[error("to_end should be a composite")]
    ToEndNotComposite,

    /// A segment the next one continues from contains no move.
    #[error("segment {index} has no move instruction to continue from")]
    MissingMove {
        /// Position in the program.
        index: usize,
    },

    /// Two template instances would share a bus key.
    #[error("sub-graph instances '{first}' and '{second}' share the key '{key}'")]
    KeyCollision {
        /// The shared key.
        key: String,
        /// Name of the instance that claimed the key first.
        first: String,
        /// Name of the colliding instance.
        second: String,
    },

    /// A template could not be instantiated.
    #[error(transparent)]
    Template(#[from] ConfigError),

    /// The generated graph could not be scheduled.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A sub-graph output was missing or malformed after the run.
    #[error("sub-graph output '{key}' is not a composite instruction")]
    MissingOutput {
        /// The output key.
        key: String,
    },
}
