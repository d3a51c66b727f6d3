//! ---
//! zko_section: "03-persistence-logging"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Applied spec persistence and storage backends."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::record::AppliedSpecRecord;
use crate::{PersistenceError, Result};

/// Current state envelope version.
pub const STATE_VERSION: u16 = 1;

/// File name used by [`FileStateStore::in_dir`].
pub const STATE_FILE_NAME: &str = "applied-spec.json";

/// Holder of the unit's single [`AppliedSpecRecord`].
pub trait StateStore {
    /// Last applied record, or `None` when nothing has been applied yet.
    fn load(&self) -> Result<Option<AppliedSpecRecord>>;

    /// Replace the stored record.
    fn save(&mut self, record: &AppliedSpecRecord) -> Result<()>;
}

/// In-process store; state lives as long as the value.
#[derive(Debug, Default, Clone)]
pub struct MemoryStateStore {
    record: Option<AppliedSpecRecord>,
    saves: usize,
}

impl MemoryStateStore {
    /// Empty store: nothing applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a previously applied record.
    pub fn with_record(record: AppliedSpecRecord) -> Self {
        Self {
            record: Some(record),
            saves: 0,
        }
    }

    /// Number of successful `save` calls.
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Current record without going through the trait.
    pub fn record(&self) -> Option<&AppliedSpecRecord> {
        self.record.as_ref()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<AppliedSpecRecord>> {
        Ok(self.record.clone())
    }

    fn save(&mut self, record: &AppliedSpecRecord) -> Result<()> {
        self.record = Some(record.clone());
        self.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateEnvelope {
    version: u16,
    saved_at: DateTime<Utc>,
    hash: String,
    record: AppliedSpecRecord,
}

/// JSON file store. Writes go to a sibling temp file which is then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Store backed by exactly `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/applied-spec.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(STATE_FILE_NAME))
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<AppliedSpecRecord>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let envelope: StateEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version != STATE_VERSION {
            return Err(PersistenceError::UnsupportedVersion(envelope.version));
        }
        if compute_hash(&envelope.record)? != envelope.hash {
            return Err(PersistenceError::HashMismatch {
                path: self.path.clone(),
            });
        }
        Ok(Some(envelope.record))
    }

    fn save(&mut self, record: &AppliedSpecRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let envelope = StateEnvelope {
            version: STATE_VERSION,
            saved_at: Utc::now(),
            hash: compute_hash(record)?,
            record: record.clone(),
        };

        let temp = self.temp_path();
        {
            let mut writer = BufWriter::new(File::create(&temp)?);
            writer.write_all(&serde_json::to_vec_pretty(&envelope)?)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), fingerprint = %record.fingerprint, "applied spec saved");
        Ok(())
    }
}

fn compute_hash(record: &AppliedSpecRecord) -> Result<String> {
    let serialized = serde_json::to_vec(record)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized);
    Ok(hex::encode(hasher.finalize()))
}
