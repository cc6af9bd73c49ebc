//! Built-in tasks.
//!
//! - [`StartTask`] - no-op entry point of generated sub-graphs
//! - [`CheckInputTask`] - conditional gate on the presence of bus keys
//! - [`UpdateStartAndEndStateTask`], [`UpdateEndStateTask`],
//!   [`UpdateStartStateTask`] - stitch the boundary states of one planned
//!   segment onto the next

mod check_input;
mod start;
mod update_state;

pub use check_input::CheckInputTask;
pub use start::StartTask;
pub use update_state::{UpdateEndStateTask, UpdateStartAndEndStateTask, UpdateStartStateTask};

/// Message reported by built-in tasks that succeed.
pub const SUCCESSFUL: &str = "Successful";
