//! ---
//! zko_section: "04-configuration-orchestration"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Desired pod spec construction from settings and membership."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Pod spec schema version understood by the orchestrator.
pub const POD_SPEC_VERSION: u32 = 3;

/// Declarative workload document handed to the orchestrator.
///
/// Equality is structural; two specs built from identical inputs compare equal
/// and serialise to identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    pub version: u32,
    pub containers: Vec<ContainerSpec>,
}

impl PodSpec {
    pub fn new(container: ContainerSpec) -> Self {
        Self {
            version: POD_SPEC_VERSION,
            containers: vec![container],
        }
    }

    pub fn container(&self) -> Option<&ContainerSpec> {
        self.containers.first()
    }

    /// SHA-256 over the canonical JSON encoding, hex encoded.
    pub fn fingerprint(&self) -> Result<String> {
        let serialized = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(serialized);
        Ok(hex::encode(hasher.finalize()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub name: String,
    pub image_details: ImageDetails,
    pub ports: Vec<ContainerPort>,
    pub env_config: IndexMap<String, String>,
    pub command: Vec<String>,
    pub volume_config: Vec<VolumeConfig>,
    pub kubernetes: KubernetesSpec,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    pub image_path: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "TCP")]
    Tcp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub name: String,
    pub container_port: u16,
    pub protocol: Protocol,
}

impl ContainerPort {
    pub fn tcp(name: impl Into<String>, container_port: u16) -> Self {
        Self {
            name: name.into(),
            container_port,
            protocol: Protocol::Tcp,
        }
    }
}

/// A named file set mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeConfig {
    pub name: String,
    pub mount_path: String,
    pub files: Vec<VolumeFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesSpec {
    pub readiness_probe: Probe,
    pub liveness_probe: Probe,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    pub tcp_socket: TcpSocketAction,
    pub timeout_seconds: u32,
    #[serde(default)]
    pub period_seconds: Option<u32>,
    pub initial_delay_seconds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpSocketAction {
    pub port: u16,
}
