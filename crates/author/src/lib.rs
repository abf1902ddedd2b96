//! Building tool: player-facing placement and removal, undo/redo.
//!
//! # Invariants
//! - Every accepted placement or removal is reversible.
//! - Rejected placements never enter the undo history.

pub mod tool;

pub use tool::{BuildCommand, BuildTool, EditError};

pub fn crate_info() -> &'static str {
    "habitat-author v0.1.0"
}
