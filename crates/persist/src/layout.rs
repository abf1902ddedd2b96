//! Layout file format:
//! ```text
//! {
//!   "schema_version": 1,
//!   "grid_unit": 4,
//!   "records": [ { "id": ..., "tag": "floor", "kind": "Floor", "position": [0, 0, 0], "yaw": 0.0, ... } ],
//!   "sha256": "<hex digest of grid_unit + records>"
//! }
//! ```

use std::path::Path;

use habitat_common::{BuildableRecord, WorldPos};
use habitat_grid::GridConfig;
use habitat_kernel::{Site, SiteError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Current layout schema version.
pub const LAYOUT_SCHEMA_VERSION: u32 = 1;

/// Errors from saving or loading a layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("saved {tag} at {pos} no longer fits the layout")]
    Conflict { tag: String, pos: WorldPos },
    #[error(transparent)]
    Site(#[from] SiteError),
}

/// Everything needed to rebuild a site: the grid unit and every placed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub schema_version: u32,
    pub grid_unit: i32,
    pub records: Vec<BuildableRecord>,
    pub sha256: String,
}

impl Layout {
    /// Capture the placed records of a site.
    pub fn capture(site: &Site) -> Result<Self, LayoutError> {
        let grid_unit = site.config().grid_unit;
        let records: Vec<BuildableRecord> = site.records().values().cloned().collect();
        let sha256 = digest(grid_unit, &records)?;
        Ok(Self {
            schema_version: LAYOUT_SCHEMA_VERSION,
            grid_unit,
            records,
            sha256,
        })
    }

    /// Recompute the digest and compare it with the stored one.
    pub fn verify(&self) -> Result<(), LayoutError> {
        let actual = digest(self.grid_unit, &self.records)?;
        if actual != self.sha256 {
            return Err(LayoutError::IntegrityMismatch {
                expected: self.sha256.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Rebuild a site by placing every record in order.
    ///
    /// A record the site refuses means the file disagrees with itself, so the
    /// load fails instead of returning a partial site.
    pub fn restore(&self) -> Result<Site, LayoutError> {
        let mut site = Site::new(GridConfig {
            grid_unit: self.grid_unit,
        })?;
        for record in &self.records {
            if !site.place(record.clone())? {
                return Err(LayoutError::Conflict {
                    tag: record.tag.clone(),
                    pos: record.position,
                });
            }
        }
        // Restoring is not an authoring operation.
        site.drain_events();
        Ok(site)
    }
}

/// Write the site's placed records to `path` as pretty JSON.
pub fn save_layout(path: impl AsRef<Path>, site: &Site) -> Result<Layout, LayoutError> {
    let layout = Layout::capture(site)?;
    serde_json::to_writer_pretty(std::fs::File::create(path.as_ref())?, &layout)?;
    tracing::info!(
        path = %path.as_ref().display(),
        records = layout.records.len(),
        "layout saved"
    );
    Ok(layout)
}

/// Read a layout from `path`, check it and replay it into a fresh site.
pub fn load_layout(path: impl AsRef<Path>) -> Result<Site, LayoutError> {
    let layout: Layout = serde_json::from_reader(std::fs::File::open(path.as_ref())?)?;
    if layout.schema_version != LAYOUT_SCHEMA_VERSION {
        return Err(LayoutError::SchemaMismatch {
            file_version: layout.schema_version,
            expected_version: LAYOUT_SCHEMA_VERSION,
        });
    }
    layout.verify()?;
    let site = layout.restore()?;
    tracing::info!(
        path = %path.as_ref().display(),
        records = layout.records.len(),
        systems = site.grid().system_count(),
        "layout loaded"
    );
    Ok(site)
}

fn digest(grid_unit: i32, records: &[BuildableRecord]) -> Result<String, LayoutError> {
    let bytes = serde_json::to_vec(&(grid_unit, records))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
