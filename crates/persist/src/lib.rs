//! Persistence: placed structures saved as tag, position and rotation.
//!
//! # Invariants
//! - Loading never trusts saved grid state; every record is replayed through
//!   the site so systems, merges and seals are rebuilt.
//! - Layout files are versioned and carry a content digest; loads fail closed.
//! - Journal segments are append-only and hash-chained; a broken link or a
//!   digest mismatch fails the whole replay.

mod journal;
mod layout;

pub use journal::{
    JOURNAL_SCHEMA_VERSION, Journal, JournalError, JournalMeta, SegmentEntry,
};
pub use layout::{LAYOUT_SCHEMA_VERSION, Layout, LayoutError, load_layout, save_layout};

pub fn crate_info() -> &'static str {
    "habitat-persist v0.1.0"
}
