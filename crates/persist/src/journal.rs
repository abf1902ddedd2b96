//! Build journal: the site event log kept as compressed segments.
//!
//! Layout inside the journal directory:
//! ```text
//! journal.meta.json        - schema version, grid unit and the segment hash chain
//! 000001.events.cbor.zst   - CBOR+zstd compressed event segments
//! ```

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use habitat_grid::GridConfig;
use habitat_kernel::{Site, SiteError, SiteEvent};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Current journal schema version.
pub const JOURNAL_SCHEMA_VERSION: u32 = 1;

const META_FILE: &str = "journal.meta.json";

/// Errors from journal operations.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("journal was recorded with grid unit {recorded}, opened with {requested}")]
    GridUnitMismatch { recorded: i32, requested: i32 },
    #[error("no journal at {0}")]
    Missing(PathBuf),
    #[error(transparent)]
    Site(#[from] SiteError),
}

/// One written segment and its place in the hash chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub filename: String,
    pub events: usize,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

/// Contents of `journal.meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalMeta {
    pub schema_version: u32,
    pub grid_unit: i32,
    pub segments: Vec<SegmentEntry>,
}

/// Append-only, integrity-chained store of site events.
#[derive(Debug)]
pub struct Journal {
    root: PathBuf,
    meta: JournalMeta,
}

impl Journal {
    /// Create a journal at `path`, or reopen one recorded with the same grid unit.
    pub fn open(path: impl AsRef<Path>, config: GridConfig) -> Result<Self, JournalError> {
        let root = path.as_ref().to_path_buf();
        if root.join(META_FILE).exists() {
            let journal = Self::open_existing(&root)?;
            if journal.meta.grid_unit != config.grid_unit {
                return Err(JournalError::GridUnitMismatch {
                    recorded: journal.meta.grid_unit,
                    requested: config.grid_unit,
                });
            }
            return Ok(journal);
        }

        std::fs::create_dir_all(&root)?;
        let journal = Self {
            root,
            meta: JournalMeta {
                schema_version: JOURNAL_SCHEMA_VERSION,
                grid_unit: config.grid_unit,
                segments: Vec::new(),
            },
        };
        journal.save_meta()?;
        Ok(journal)
    }

    /// Reopen an existing journal, taking the grid unit from its metadata.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let root = path.as_ref().to_path_buf();
        let meta_path = root.join(META_FILE);
        if !meta_path.exists() {
            return Err(JournalError::Missing(root));
        }
        let meta: JournalMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
        if meta.schema_version != JOURNAL_SCHEMA_VERSION {
            return Err(JournalError::SchemaMismatch {
                file_version: meta.schema_version,
                expected_version: JOURNAL_SCHEMA_VERSION,
            });
        }
        Ok(Self { root, meta })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &JournalMeta {
        &self.meta
    }

    pub fn segment_count(&self) -> usize {
        self.meta.segments.len()
    }

    pub fn event_count(&self) -> usize {
        self.meta.segments.iter().map(|s| s.events).sum()
    }

    /// Write `events` as a new segment. An empty slice writes nothing.
    pub fn append(&mut self, events: &[SiteEvent]) -> Result<(), JournalError> {
        if events.is_empty() {
            return Ok(());
        }
        let filename = format!("{:06}.events.cbor.zst", self.meta.segments.len() + 1);
        let compressed = zstd_compress(&cbor_serialize(events)?)?;
        let sha256 = sha256_hex(&compressed);
        let prev_hash = self.meta.segments.last().map(|s| s.sha256.clone());

        std::fs::write(self.root.join(&filename), &compressed)?;
        self.meta.segments.push(SegmentEntry {
            filename,
            events: events.len(),
            sha256,
            prev_hash,
        });
        self.save_meta()?;

        tracing::info!(
            segment = self.meta.segments.len(),
            events = events.len(),
            "journal segment written"
        );
        Ok(())
    }

    /// Check chain continuity and every segment's digest.
    pub fn verify(&self) -> Result<(), JournalError> {
        let mut prev_hash: Option<&String> = None;
        for entry in &self.meta.segments {
            if entry.prev_hash.as_ref() != prev_hash {
                return Err(JournalError::IntegrityMismatch {
                    expected: prev_hash.cloned().unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }
            self.read_segment(entry)?;
            prev_hash = Some(&entry.sha256);
        }
        Ok(())
    }

    /// Rebuild the site by replaying every segment in order.
    pub fn replay(&self) -> Result<Site, JournalError> {
        let mut events = Vec::with_capacity(self.event_count());
        for entry in &self.meta.segments {
            let compressed = self.read_segment(entry)?;
            let segment: Vec<SiteEvent> = cbor_deserialize(&zstd_decompress(&compressed)?)?;
            events.extend(segment);
        }
        let site = Site::replay(
            GridConfig {
                grid_unit: self.meta.grid_unit,
            },
            &events,
        )?;
        tracing::info!(
            events = events.len(),
            placements = site.placement_count(),
            "journal replayed"
        );
        Ok(site)
    }

    /// Read a segment file and check it against its recorded digest.
    fn read_segment(&self, entry: &SegmentEntry) -> Result<Vec<u8>, JournalError> {
        let data = std::fs::read(self.root.join(&entry.filename))?;
        let actual = sha256_hex(&data);
        if actual != entry.sha256 {
            return Err(JournalError::IntegrityMismatch {
                expected: entry.sha256.clone(),
                actual,
            });
        }
        Ok(data)
    }

    fn save_meta(&self) -> Result<(), JournalError> {
        let path = self.root.join(META_FILE);
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, JournalError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| JournalError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, JournalError> {
    ciborium::from_reader(data).map_err(|e| JournalError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, JournalError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, JournalError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
