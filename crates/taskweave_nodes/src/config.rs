//! Template configuration documents.
//!
//! A [`TemplateConfig`] says which registered template to instantiate and how
//! to rewrite its bus keys for one instance:
//!
//! ```json
//! {
//!     "task": "CartesianPipeline",
//!     "input_remapping": { "input_data": "raster_input" },
//!     "output_remapping": { "output_data": "raster_output" },
//!     "input_indexing": ["raster_input"],
//!     "output_indexing": ["raster_output"]
//! }
//! ```
//!
//! `task`, `input_indexing` and `output_indexing` are required. Remapping
//! runs first, so indexing lists name keys after remapping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How to instantiate one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateConfig {
    /// Registered template name.
    pub task: String,
    /// Input key renames applied before indexing.
    pub input_remapping: IndexMap<String, String>,
    /// Output key renames applied before indexing.
    pub output_remapping: IndexMap<String, String>,
    /// Input keys that get the instance index appended.
    pub input_indexing: Vec<String>,
    /// Output keys that get the instance index appended.
    pub output_indexing: Vec<String>,
}

#[derive(Deserialize)]
struct RawTemplateConfig {
    task: Option<String>,
    #[serde(default)]
    input_remapping: IndexMap<String, String>,
    #[serde(default)]
    output_remapping: IndexMap<String, String>,
    input_indexing: Option<Vec<String>>,
    output_indexing: Option<Vec<String>>,
}

impl TemplateConfig {
    /// Creates a config for `task` with no remapping or indexing.
    #[must_use]
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            input_remapping: IndexMap::new(),
            output_remapping: IndexMap::new(),
            input_indexing: Vec::new(),
            output_indexing: Vec::new(),
        }
    }

    /// Adds an input rename.
    #[must_use]
    pub fn remap_input(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.input_remapping.insert(from.into(), to.into());
        self
    }

    /// Adds an output rename.
    #[must_use]
    pub fn remap_output(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.output_remapping.insert(from.into(), to.into());
        self
    }

    /// Marks input keys for per-instance indexing.
    #[must_use]
    pub fn index_inputs(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.input_indexing.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Marks output keys for per-instance indexing.
    #[must_use]
    pub fn index_outputs(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.output_indexing.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Reads the config section named `entry`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Parse`] if the section is not a well-formed object
    /// - [`ConfigError::MissingField`] if a required field is absent
    pub fn from_value(entry: &str, value: &serde_json::Value) -> Result<Self, ConfigError> {
        let raw: RawTemplateConfig =
            serde_json::from_value(value.clone()).map_err(|source| ConfigError::Parse {
                entry: entry.to_owned(),
                source,
            })?;

        Ok(Self {
            task: raw
                .task
                .ok_or_else(|| ConfigError::missing_field(entry, "task"))?,
            input_remapping: raw.input_remapping,
            output_remapping: raw.output_remapping,
            input_indexing: raw
                .input_indexing
                .ok_or_else(|| ConfigError::missing_field(entry, "input_indexing"))?,
            output_indexing: raw
                .output_indexing
                .ok_or_else(|| ConfigError::missing_field(entry, "output_indexing"))?,
        })
    }
}

/// The three templates a raster pipeline instantiates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RasterConfig {
    /// Template for the `from_start` and `to_end` boundary moves.
    pub freespace: TemplateConfig,
    /// Template for each raster segment.
    pub raster: TemplateConfig,
    /// Template for each transition between rasters.
    pub transition: TemplateConfig,
}

impl RasterConfig {
    /// Section name used in error reports.
    pub const ENTRY: &'static str = "RasterMotionTask";

    /// Parses a JSON document with `freespace`, `raster` and `transition`
    /// sections.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Parse`] for malformed JSON
    /// - [`ConfigError::MissingField`] for a missing section or field
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|source| ConfigError::Parse {
                entry: Self::ENTRY.to_owned(),
                source,
            })?;
        Self::from_value(&value)
    }

    /// Reads the three sections from an already-parsed document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingField`] for a missing section or field.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let section = |entry: &str| -> Result<TemplateConfig, ConfigError> {
            let section = value
                .get(entry)
                .ok_or_else(|| ConfigError::missing_field(Self::ENTRY, entry))?;
            TemplateConfig::from_value(entry, section)
        };
        Ok(Self {
            freespace: section("freespace")?,
            raster: section("raster")?,
            transition: section("transition")?,
        })
    }

    /// The sections paired with their entry names.
    #[must_use]
    pub fn sections(&self) -> [(&'static str, &TemplateConfig); 3] {
        [
            ("freespace", &self.freespace),
            ("raster", &self.raster),
            ("transition", &self.transition),
        ]
    }
}
