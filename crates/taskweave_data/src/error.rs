//! Error types for typed data bus access.

use crate::value::DataKind;
use thiserror::Error;

/// Errors returned by the typed accessors of [`DataBus`](crate::DataBus).
///
/// A plain [`get`](crate::DataBus::get) never fails; it reports absence with
/// `None`. The typed accessors fold absence and tag mismatches into this enum
/// so tasks can turn them straight into a failure message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// No value is stored under the key.
    #[error("no data stored under key '{key}'")]
    Missing {
        /// The key that was read.
        key: String,
    },

    /// A value is stored, but with a different tag than requested.
    #[error("data under key '{key}' is {found}, expected {expected}")]
    TypeMismatch {
        /// The key that was read.
        key: String,
        /// The requested tag.
        expected: DataKind,
        /// The tag actually stored.
        found: DataKind,
    },
}

impl DataError {
    /// Creates a [`Missing`](Self::Missing) error.
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    /// Creates a [`TypeMismatch`](Self::TypeMismatch) error.
    pub fn type_mismatch(key: impl Into<String>, expected: DataKind, found: DataKind) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected,
            found,
        }
    }

    /// Returns the key involved in the failed access.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Missing { key } | Self::TypeMismatch { key, .. } => key,
        }
    }
}
