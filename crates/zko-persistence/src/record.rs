//! ---
//! zko_section: "03-persistence-logging"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Applied spec persistence and storage backends."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zko_spec::PodSpec;

use crate::Result;

/// The last pod spec accepted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedSpecRecord {
    /// Spec exactly as it was applied.
    pub spec: PodSpec,
    /// SHA-256 of the spec, kept for logs and operators.
    pub fingerprint: String,
    /// When the apply call succeeded.
    pub applied_at: DateTime<Utc>,
}

impl AppliedSpecRecord {
    /// Record `spec` as applied now.
    pub fn new(spec: PodSpec) -> Result<Self> {
        let fingerprint = spec.fingerprint()?;
        Ok(Self {
            spec,
            fingerprint,
            applied_at: Utc::now(),
        })
    }

    /// Structural comparison against a freshly built spec.
    pub fn matches(&self, desired: &PodSpec) -> bool {
        &self.spec == desired
    }
}
