//! Shared data primitives for taskweave (Layer 1).
//!
//! Nodes never call each other directly. Everything one node produces for
//! another travels through a [`DataBus`] under a string key.
//!
//! # Core Concepts
//!
//! - [`bus`] - Thread-safe keyed store exchanged between nodes
//! - [`value`] - The closed, explicitly tagged [`Data`] variant stored on the bus
//! - [`instruction`] - Payload model for motion programs (composites of moves)
//! - [`error`] - Typed access errors
//!
//! # Example
//!
//! ```
//! use taskweave_data::{CompositeInstruction, DataBus};
//!
//! let bus = DataBus::new();
//! bus.set("program", CompositeInstruction::new("raster"));
//!
//! assert!(bus.contains("program"));
//! assert!(bus.get_composite("program").is_ok());
//! assert!(bus.get("missing").is_none());
//! ```

/// Thread-safe keyed store.
pub mod bus;

/// Typed access errors.
pub mod error;

/// Motion program payload model.
pub mod instruction;

/// Tagged bus values.
pub mod value;

pub use bus::DataBus;
pub use error::DataError;
pub use instruction::{
    CompositeInstruction, Instruction, ManipulatorInfo, MoveInstruction, MoveKind, Waypoint,
};
pub use value::{Data, DataKind};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::bus::*;
    pub use crate::error::*;
    pub use crate::instruction::*;
    pub use crate::value::*;
}
