//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Shared primitives and utilities for the operator runtime."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zko_spec::{Configuration, SettingValue};

use crate::logging::LogFormat;

fn default_application() -> String {
    "zookeeper-k8s".to_owned()
}

fn default_unit_name() -> String {
    "zookeeper-k8s/0".to_owned()
}

fn default_peer_relation() -> String {
    "cluster".to_owned()
}

fn default_client_relation() -> String {
    "zookeeper".to_owned()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("target/zko-state")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the hook runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorConfig {
    #[serde(default)]
    pub unit: UnitConfig,
    #[serde(default)]
    pub relations: RelationsConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Charm settings layered over the charm defaults.
    #[serde(default)]
    pub settings: IndexMap<String, SettingValue>,
}

/// Metadata describing where an [`OperatorConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedOperatorConfig {
    pub config: OperatorConfig,
    pub source: PathBuf,
}

impl OperatorConfig {
    pub const ENV_CONFIG_PATH: &str = "ZKO_CONFIG";

    /// Load configuration from disk, respecting the `ZKO_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedOperatorConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedOperatorConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedOperatorConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<OperatorConfig>()
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Charm settings as seen by the reconciliation core.
    pub fn charm_configuration(&self) -> Configuration {
        self.settings
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Path of the environment description consumed by the local hook runner.
    pub fn environment_path(&self) -> PathBuf {
        self.storage
            .environment_file
            .clone()
            .unwrap_or_else(|| self.storage.state_dir.join("environment.toml"))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.unit.validate()?;
        self.relations.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for OperatorConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: OperatorConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Identity of the unit this process acts for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    #[serde(default = "default_application")]
    pub application: String,
    #[serde(default = "default_unit_name")]
    pub name: String,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            application: default_application(),
            name: default_unit_name(),
        }
    }
}

impl UnitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.application.trim().is_empty() {
            return Err(anyhow!("unit.application cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(anyhow!("unit.name cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationsConfig {
    #[serde(default = "default_peer_relation")]
    pub peer: String,
    #[serde(default = "default_client_relation")]
    pub client: String,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            peer: default_peer_relation(),
            client: default_client_relation(),
        }
    }
}

impl RelationsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.peer.trim().is_empty() || self.client.trim().is_empty() {
            return Err(anyhow!("relation names cannot be empty"));
        }
        if self.peer == self.client {
            return Err(anyhow!(
                "peer and client relations must differ (both are '{}')",
                self.peer
            ));
        }
        Ok(())
    }
}

/// Namespace the leader writes connection data under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublishScope {
    /// The leader unit's own relation data bag.
    #[default]
    Unit,
    /// The application-wide relation data bag.
    Application,
}

impl std::str::FromStr for PublishScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unit" => Ok(PublishScope::Unit),
            "application" | "app" => Ok(PublishScope::Application),
            other => Err(format!("unknown publish scope: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub scope: PublishScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default)]
    pub environment_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            environment_file: None,
        }
    }
}

/// Optional override for the bundled pod templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
