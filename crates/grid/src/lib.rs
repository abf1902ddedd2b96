//! Building grid: which cells hold floors and walls, how they group into
//! connected structure systems, and which cells are sealed from the outside.
//!
//! # Invariants
//! - Each structure system is exactly one 6-connected component of occupied cells.
//! - No occupied cell belongs to two systems.
//! - Rejected placements and failed removals leave the grid untouched.
//! - Seal state is recomputed before any mutating `BuildingGrid` call returns.
//!
//! Connectivity is maintained by full recompute: merges copy whole boxes and a
//! disconnecting removal flood-fills the owning system. This is O(volume) per
//! edit, which is fine at the rate of player actions.

mod building;
mod cell;
mod collider;
mod config;
mod structure;

pub use building::{BuildingGrid, GridError, Removal};
pub use cell::Cell;
pub use collider::{Aabb, ColliderQuery, ColliderSet};
pub use config::GridConfig;
pub use structure::StructureSystem;

pub fn crate_info() -> &'static str {
    "habitat-grid v0.1.0"
}
