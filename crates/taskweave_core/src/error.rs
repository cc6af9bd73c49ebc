//! Server and tracing setup errors.

use taskweave_graph::executor::ExecutionError;
use thiserror::Error;

/// Errors returned by [`TaskServer`](crate::server::TaskServer) lookups and
/// runs.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No executor is registered under the name.
    #[error("executor '{0}' does not exist")]
    UnknownExecutor(String),

    /// No task is registered under the name.
    #[error("task '{0}' does not exist")]
    UnknownTask(String),

    /// The executor refused the run.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Errors raised while installing the global tracing subscriber.
#[derive(Debug, Error)]
pub enum TracingInitError {
    /// The filter directive string could not be parsed.
    #[error("invalid tracing filter '{filter}': {source}")]
    InvalidFilter {
        /// The rejected directives.
        filter: String,
        /// Parser error.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber is already installed.
    #[error(transparent)]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}
