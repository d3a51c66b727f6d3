//! ---
//! zko_section: "04-configuration-orchestration"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Desired pod spec construction from settings and membership."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecError};

/// Settings that must have a non-empty effective value before a spec is built.
pub const REQUIRED_SETTINGS: [&str; 4] = [
    "zookeeper_image_path",
    "client-port",
    "server-port",
    "leader-port",
];

/// A single charm setting as supplied by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl SettingValue {
    /// Empty strings count as unset.
    pub fn is_empty(&self) -> bool {
        matches!(self, SettingValue::Str(value) if value.trim().is_empty())
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(value) => write!(f, "{}", value),
            SettingValue::Int(value) => write!(f, "{}", value),
            SettingValue::Str(value) => f.write_str(value),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Str(value.to_owned())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Str(value)
    }
}

/// Value used when the operator leaves a setting unset.
pub fn charm_default(key: &str) -> Option<SettingValue> {
    let value = match key {
        "zookeeper_image_username" | "zookeeper_image_password" => SettingValue::from(""),
        "client-port" => SettingValue::Int(2181),
        "server-port" => SettingValue::Int(2888),
        "leader-port" => SettingValue::Int(3888),
        "tick-time" => SettingValue::Int(2000),
        "init-limit" => SettingValue::Int(5),
        "sync-limit" => SettingValue::Int(2),
        "max-client-cnxns" => SettingValue::Int(60),
        "adminserver-enabled" => SettingValue::Bool(false),
        "autopurge-purgeinterval" => SettingValue::Int(0),
        "autopurge-snapretaincount" => SettingValue::Int(3),
        "4lw-commands-whitelist" => SettingValue::from("srvr"),
        "cfg-extra" => SettingValue::from(""),
        "log4j-prop" => SettingValue::from("INFO,CONSOLE"),
        _ => return None,
    };
    Some(value)
}

/// Read-only view of the charm settings for one reconciliation attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: IndexMap<String, SettingValue>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper used by callers assembling settings by hand.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Explicitly supplied value, ignoring charm defaults.
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    /// Explicit value when present, otherwise the charm default.
    pub fn effective(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned().or_else(|| charm_default(key))
    }

    /// Required settings whose effective value is absent or empty, in declaration order.
    pub fn missing_required(&self) -> Vec<String> {
        REQUIRED_SETTINGS
            .iter()
            .filter(|key| self.effective(key).map_or(true, |value| value.is_empty()))
            .map(|key| (*key).to_owned())
            .collect()
    }

    /// Effective value rendered as a string.
    pub fn text(&self, key: &str) -> Result<String> {
        self.effective(key)
            .map(|value| value.to_string())
            .ok_or_else(|| SpecError::MissingSetting(key.to_owned()))
    }

    /// Effective value interpreted as a TCP port.
    pub fn port(&self, key: &str) -> Result<u16> {
        let value = self
            .effective(key)
            .ok_or_else(|| SpecError::MissingSetting(key.to_owned()))?;
        let invalid = |reason: String| SpecError::InvalidSetting {
            key: key.to_owned(),
            reason,
        };
        let port = match &value {
            SettingValue::Int(raw) => u16::try_from(*raw)
                .map_err(|_| invalid(format!("{} is not a valid port", raw)))?,
            SettingValue::Str(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| invalid(format!("'{}' is not a valid port", raw)))?,
            SettingValue::Bool(_) => return Err(invalid("expected a port number".to_owned())),
        };
        if port == 0 {
            return Err(invalid("port 0 is reserved".to_owned()));
        }
        Ok(port)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.values.iter()
    }
}

impl FromIterator<(String, SettingValue)> for Configuration {
    fn from_iter<T: IntoIterator<Item = (String, SettingValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
