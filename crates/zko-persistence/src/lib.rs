//! ---
//! zko_section: "03-persistence-logging"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Applied spec persistence and storage backends."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Storage for the last successfully applied pod spec.

use std::path::PathBuf;

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing the state file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Fingerprinting the spec failed.
    #[error("spec error: {0}")]
    Spec(#[from] zko_spec::SpecError),
    /// Reported when the state file fails integrity verification.
    #[error("state file {path} hash mismatch")]
    HashMismatch {
        /// File that failed verification.
        path: PathBuf,
    },
    /// The envelope was written by an incompatible version.
    #[error("unsupported state envelope version {0}")]
    UnsupportedVersion(u16),
}

pub mod record;
pub mod store;

pub use record::AppliedSpecRecord;
pub use store::{FileStateStore, MemoryStateStore, StateStore, STATE_FILE_NAME, STATE_VERSION};
