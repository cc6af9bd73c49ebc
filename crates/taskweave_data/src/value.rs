//! Tagged values stored on the data bus.
//!
//! Every value carries an explicit [`DataKind`] tag. Consumers branch on the
//! tag instead of probing the concrete type at run time.

use crate::instruction::{CompositeInstruction, MoveInstruction};
use serde::{Deserialize, Serialize};

/// Discriminant of a [`Data`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// A [`CompositeInstruction`].
    Composite,
    /// A single [`MoveInstruction`].
    Move,
    /// An arbitrary JSON document.
    Json,
}

impl core::fmt::Display for DataKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Composite => "composite",
            Self::Move => "move",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// A value exchanged between nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Data {
    /// An ordered group of instructions.
    Composite(CompositeInstruction),
    /// A single move.
    Move(MoveInstruction),
    /// Free-form JSON, for payloads outside the instruction model.
    Json(serde_json::Value),
}

impl Data {
    /// Returns the explicit tag of this value.
    #[must_use]
    pub fn kind(&self) -> DataKind {
        match self {
            Self::Composite(_) => DataKind::Composite,
            Self::Move(_) => DataKind::Move,
            Self::Json(_) => DataKind::Json,
        }
    }

    /// Returns the composite if this value is tagged [`DataKind::Composite`].
    #[must_use]
    pub fn as_composite(&self) -> Option<&CompositeInstruction> {
        match self {
            Self::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    /// Returns the move if this value is tagged [`DataKind::Move`].
    #[must_use]
    pub fn as_move(&self) -> Option<&MoveInstruction> {
        match self {
            Self::Move(mv) => Some(mv),
            _ => None,
        }
    }

    /// Returns the JSON document if this value is tagged [`DataKind::Json`].
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl From<CompositeInstruction> for Data {
    fn from(value: CompositeInstruction) -> Self {
        Self::Composite(value)
    }
}

impl From<MoveInstruction> for Data {
    fn from(value: MoveInstruction) -> Self {
        Self::Move(value)
    }
}

impl From<serde_json::Value> for Data {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}
