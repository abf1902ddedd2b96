//! Life support: per-tick oxygen bookkeeping driven by grid seal state.
//!
//! # Invariants
//! - Consumers only read the grid; they never mutate it.
//! - Oxygen level stays within `[0, capacity]`.

mod oxygen;

pub use oxygen::{Exposure, Hazard, OxygenConfig, OxygenConsumer, OxygenStats};

pub fn crate_info() -> &'static str {
    "habitat-life-support v0.1.0"
}
