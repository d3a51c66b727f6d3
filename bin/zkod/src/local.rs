//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "binary"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Local substrate backing the hook runner with files under the state directory."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use zko_cluster::StaticPeerDirectory;
use zko_common::PublishScope;
use zko_core::{
    ApplyError, ConnectionRecord, PodSpecApplier, RelationDataWriter, RelationWriteError,
    StatusSink, UnitStatus,
};
use zko_spec::PodSpec;

pub const PODSPEC_FILE: &str = "podspec.yaml";
pub const STATUS_FILE: &str = "status.json";
pub const DEFERRED_FILE: &str = "deferred.json";
pub const RELATIONS_DIR: &str = "relations";

fn default_leader() -> bool {
    true
}

/// What the substrate would tell this unit: leadership, peers and bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default = "default_leader")]
    pub leader: bool,
    #[serde(flatten)]
    pub peers: StaticPeerDirectory,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            leader: default_leader(),
            peers: StaticPeerDirectory::default(),
        }
    }
}

impl Environment {
    /// Missing file means a lone leader with no relations.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no environment file; using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("unable to read environment {}", path.display()))
            }
        };
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse environment {}", path.display()))
    }
}

/// Writes each applied spec to `podspec.yaml`.
#[derive(Debug, Clone)]
pub struct YamlPodSpecApplier {
    path: PathBuf,
}

impl YamlPodSpecApplier {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(PODSPEC_FILE),
        }
    }
}

impl PodSpecApplier for YamlPodSpecApplier {
    fn set_spec(&mut self, spec: &PodSpec) -> Result<(), ApplyError> {
        let yaml =
            serde_yaml::to_string(spec).map_err(|err| ApplyError::Rejected(err.to_string()))?;
        write_file(&self.path, yaml.as_bytes())
            .map_err(|err| ApplyError::Unavailable(err.to_string()))?;
        debug!(path = %self.path.display(), "pod spec written");
        Ok(())
    }
}

/// One relation data file: namespace (unit or application name) to key/value bag.
type RelationBags = IndexMap<String, IndexMap<String, String>>;

/// Relation data as JSON files under `relations/`.
#[derive(Debug, Clone)]
pub struct JsonRelationData {
    dir: PathBuf,
    unit: String,
    application: String,
}

impl JsonRelationData {
    pub fn new(state_dir: &Path, unit: &str, application: &str) -> Self {
        Self {
            dir: state_dir.join(RELATIONS_DIR),
            unit: unit.to_owned(),
            application: application.to_owned(),
        }
    }

    pub fn path_for(&self, relation: &str, relation_id: Option<u32>) -> PathBuf {
        let name = match relation_id {
            Some(id) => format!("{relation}-{id}.json"),
            None => format!("{relation}.json"),
        };
        self.dir.join(name)
    }
}

impl RelationDataWriter for JsonRelationData {
    fn write(
        &mut self,
        relation: &str,
        relation_id: Option<u32>,
        scope: PublishScope,
        record: &ConnectionRecord,
    ) -> Result<(), RelationWriteError> {
        let path = self.path_for(relation, relation_id);
        let mut bags: RelationBags = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => RelationBags::new(),
            Err(err) => return Err(err.into()),
        };
        let namespace = match scope {
            PublishScope::Unit => self.unit.clone(),
            PublishScope::Application => self.application.clone(),
        };
        // Relation data has no append semantics; the bag is replaced.
        bags.insert(namespace, record.to_relation_data());
        write_file(&path, &serde_json::to_vec_pretty(&bags)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDocument {
    pub unit: String,
    pub status: UnitStatus,
    pub updated_at: DateTime<Utc>,
}

/// Keeps `status.json` in step with the latest reported status.
#[derive(Debug, Clone)]
pub struct JsonStatusFile {
    path: PathBuf,
    unit: String,
}

impl JsonStatusFile {
    pub fn new(state_dir: &Path, unit: &str) -> Self {
        Self {
            path: state_dir.join(STATUS_FILE),
            unit: unit.to_owned(),
        }
    }

    #[cfg(test)]
    pub fn read(&self) -> Result<Option<StatusDocument>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl StatusSink for JsonStatusFile {
    fn set_status(&mut self, status: &UnitStatus) {
        let document = StatusDocument {
            unit: self.unit.clone(),
            status: status.clone(),
            updated_at: Utc::now(),
        };
        let result = serde_json::to_vec_pretty(&document)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| write_file(&self.path, &bytes).map_err(anyhow::Error::from));
        if let Err(err) = result {
            error!(path = %self.path.display(), error = %err, "failed to write status");
        }
    }
}

/// A hook the substrate must re-deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedEvent {
    pub name: String,
    #[serde(default)]
    pub remote_unit: Option<String>,
    #[serde(default)]
    pub relation_id: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct DeferredQueue {
    path: PathBuf,
}

impl DeferredQueue {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(DEFERRED_FILE),
        }
    }

    pub fn load(&self) -> Result<Vec<QueuedEvent>> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("corrupt deferred queue {}", self.path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// An empty queue removes the file.
    pub fn store(&self, events: &[QueuedEvent]) -> Result<()> {
        if events.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
                _ => Ok(()),
            };
        }
        write_file(&self.path, &serde_json::to_vec_pretty(events)?)?;
        Ok(())
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)
}
