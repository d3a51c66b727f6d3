//! ---
//! zko_section: "04-configuration-orchestration"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Desired pod spec construction from settings and membership."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpecError>;

/// Placeholder substitution failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unresolved placeholder '{placeholder}' at byte {offset}")]
    Unresolved { placeholder: String, offset: usize },
    #[error("malformed placeholder at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },
}

/// Fatal conditions while building the desired pod spec.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("missing setting '{0}'")]
    MissingSetting(String),
    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },
    #[error("failed to render template {file}: {source}")]
    Template {
        file: String,
        #[source]
        source: TemplateError,
    },
    #[error("unable to read templates from {path}: {source}")]
    TemplateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
