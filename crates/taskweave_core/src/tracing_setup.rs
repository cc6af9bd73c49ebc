//! Global `tracing` subscriber setup.
//!
//! Library crates only emit events. Binaries call [`TracingConfig::try_init`]
//! once at startup to decide where those events go.
//!
//! ```
//! use taskweave_core::tracing_setup::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! // Development: colored output, scheduler internals included
//! let dev = TracingConfig::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Pretty);
//!
//! // Production: JSON lines, only the graph crate at debug
//! let prod = TracingConfig::new()
//!     .with_format(TracingFormat::Json)
//!     .with_env_filter("info,taskweave_graph=debug");
//! # let _ = (dev, prod);
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::TracingInitError;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

/// Subscriber configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Maximum level when no env filter is set.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    /// Directives such as `"info,taskweave_graph=debug"`. Overrides `level`.
    pub env_filter: Option<String>,
    /// Whether span enter/exit events are printed.
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Creates a config with `INFO` level and pretty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets filter directives, `target=level,target=level,...`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Builds the filter this config describes.
    ///
    /// # Errors
    ///
    /// [`TracingInitError::InvalidFilter`] if the directives do not parse.
    pub fn filter(&self) -> Result<EnvFilter, TracingInitError> {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).map_err(|source| TracingInitError::InvalidFilter {
                    filter: filter.clone(),
                    source,
                })
            }
            None => Ok(EnvFilter::new(self.level.as_str())),
        }
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// - [`TracingInitError::InvalidFilter`] for unparsable directives, in
    ///   which case nothing is installed
    /// - [`TracingInitError::AlreadyInitialized`] if a global subscriber is
    ///   already set
    pub fn try_init(&self) -> Result<(), TracingInitError> {
        let filter = self.filter()?;
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        let registry = tracing_subscriber::registry().with(filter);
        match self.format {
            TracingFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init()?,
            TracingFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init()?,
            TracingFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init()?,
        }

        tracing::info!(level = %self.level, format = ?self.format, "tracing initialized");
        Ok(())
    }
}
