//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Leader-gated reconciliation and hook lifecycle management."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use zko_common::PublishScope;
use zko_spec::PodSpec;

/// Workload status reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum UnitStatus {
    Active(String),
    Maintenance(String),
    Blocked(String),
    Waiting(String),
}

impl UnitStatus {
    pub fn active(message: impl Into<String>) -> Self {
        UnitStatus::Active(message.into())
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        UnitStatus::Blocked(message.into())
    }

    pub fn waiting(message: impl Into<String>) -> Self {
        UnitStatus::Waiting(message.into())
    }

    pub fn name(&self) -> &'static str {
        match self {
            UnitStatus::Active(_) => "active",
            UnitStatus::Maintenance(_) => "maintenance",
            UnitStatus::Blocked(_) => "blocked",
            UnitStatus::Waiting(_) => "waiting",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            UnitStatus::Active(message)
            | UnitStatus::Maintenance(message)
            | UnitStatus::Blocked(message)
            | UnitStatus::Waiting(message) => message,
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.message())
    }
}

/// Failure reported by the orchestrator when a spec is set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("orchestrator rejected pod spec: {0}")]
    Rejected(String),
    #[error("orchestrator unavailable: {0}")]
    Unavailable(String),
}

/// Orchestrator API that runs the workload from a pod spec.
pub trait PodSpecApplier {
    fn set_spec(&mut self, spec: &PodSpec) -> Result<(), ApplyError>;
}

/// Connection details handed to client applications.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub port: String,
    pub rest_port: String,
    #[serde(default)]
    pub host: Option<String>,
}

impl ConnectionRecord {
    pub fn new(port: u16, rest_port: u16, host: Option<String>) -> Self {
        Self {
            port: port.to_string(),
            rest_port: rest_port.to_string(),
            host,
        }
    }

    /// Flat key/value view as written into the relation data bag.
    pub fn to_relation_data(&self) -> IndexMap<String, String> {
        let mut data = IndexMap::new();
        data.insert("port".to_owned(), self.port.clone());
        data.insert("rest_port".to_owned(), self.rest_port.clone());
        if let Some(host) = &self.host {
            data.insert("host".to_owned(), host.clone());
        }
        data
    }
}

#[derive(Debug, Error)]
pub enum RelationWriteError {
    #[error("relation {relation} rejected write: {reason}")]
    Rejected { relation: String, reason: String },
    #[error("relation data io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("relation data encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outbound relation data interface consumed by dependent applications.
pub trait RelationDataWriter {
    fn write(
        &mut self,
        relation: &str,
        relation_id: Option<u32>,
        scope: PublishScope,
        record: &ConnectionRecord,
    ) -> Result<(), RelationWriteError>;
}

/// Receives the unit status after each handled hook.
pub trait StatusSink {
    fn set_status(&mut self, status: &UnitStatus);
}
