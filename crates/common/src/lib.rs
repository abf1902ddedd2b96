//! Shared types for the habitat building grid.
//!
//! # Invariants
//! - World positions are integral; the grid unit converts them to cell indices.
//! - Edges are addressed by enum, never by field.

mod types;

pub use types::{Buildable, BuildableKind, BuildableRecord, Edge, PlacementId, WorldPos};
