//! Site kernel: the authoritative owner of one building grid and every
//! module placed on it.
//!
//! # Invariants
//! - All placements and removals flow through `Site` and produce an event.
//! - Replaying the event log into a fresh site reproduces the same state hash.

pub mod site;

pub use site::{Site, SiteError, SiteEvent};
