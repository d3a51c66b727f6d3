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

use thiserror::Error;
use zko_cluster::MembershipTracker;
use zko_logging::{zko_debug, zko_error, zko_info, zko_warn};
use zko_persistence::{AppliedSpecRecord, PersistenceError, StateStore};
use zko_spec::{SpecBuilder, SpecError};

use crate::context::HookContext;
use crate::substrate::{ApplyError, PodSpecApplier, UnitStatus};

pub const FOLLOWER_STATUS: &str = "follower, standing by";
pub const READY_STATUS: &str = "ready";

/// Why a reconciliation was requested. All reasons share one code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    ConfigChanged,
    Start,
    Upgrade,
    MembersChanged,
}

impl TriggerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReason::ConfigChanged => "config-changed",
            TriggerReason::Start => "start",
            TriggerReason::Upgrade => "upgrade",
            TriggerReason::MembersChanged => "members-changed",
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    NotLeader,
    ConfigIncomplete { missing: Vec<String> },
    UpToDate { fingerprint: String },
    Applied { fingerprint: String },
}

impl ReconcileOutcome {
    pub fn status(&self) -> UnitStatus {
        match self {
            ReconcileOutcome::NotLeader => UnitStatus::active(FOLLOWER_STATUS),
            ReconcileOutcome::ConfigIncomplete { missing } => {
                UnitStatus::blocked(missing_config_message(missing))
            }
            ReconcileOutcome::UpToDate { .. } | ReconcileOutcome::Applied { .. } => {
                UnitStatus::active(READY_STATUS)
            }
        }
    }
}

/// `missing config a;missing config b`
pub fn missing_config_message(missing: &[String]) -> String {
    missing
        .iter()
        .map(|key| format!("missing config {key}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Conditions that stop a reconciliation attempt. The stored record is untouched.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("pod spec build failed: {0}")]
    Build(#[from] SpecError),
    #[error("pod spec apply failed: {0}")]
    ApplyFailed(#[from] ApplyError),
    #[error("applied spec state error: {0}")]
    Persist(#[from] PersistenceError),
}

impl ReconcileError {
    pub fn status(&self) -> UnitStatus {
        UnitStatus::blocked(self.to_string())
    }
}

/// Computes the desired pod spec and applies it only when it differs from the last applied one.
///
/// Owns the applied spec store; nothing else reads or writes it.
pub struct Reconciler<S, A> {
    builder: SpecBuilder,
    tracker: MembershipTracker,
    store: S,
    applier: A,
}

impl<S, A> Reconciler<S, A>
where
    S: StateStore,
    A: PodSpecApplier,
{
    pub fn new(builder: SpecBuilder, tracker: MembershipTracker, store: S, applier: A) -> Self {
        Self {
            builder,
            tracker,
            store,
            applier,
        }
    }

    pub fn tracker(&self) -> &MembershipTracker {
        &self.tracker
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reconcile(
        &mut self,
        ctx: &HookContext<'_>,
        reason: TriggerReason,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let log = ctx.log_context();
        if !ctx.is_leader {
            zko_debug!(context = log, "not leader; skipping {} reconcile", reason);
            return Ok(ReconcileOutcome::NotLeader);
        }

        let missing = ctx.config.missing_required();
        if !missing.is_empty() {
            zko_warn!(context = log, "configuration incomplete on {}: {:?}", reason, missing);
            return Ok(ReconcileOutcome::ConfigIncomplete { missing });
        }

        let membership = self.tracker.snapshot(ctx.peers);
        let desired = self.builder.build(ctx.config, &membership)?;
        let fingerprint = desired.fingerprint()?;

        // An unreadable record counts as nothing applied; the next save overwrites it.
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(err) => {
                zko_error!(context = log, "discarding unreadable applied spec record: {}", err);
                None
            }
        };
        if let Some(applied) = stored {
            if applied.matches(&desired) {
                zko_debug!(context = log, "pod spec up to date on {} ({})", reason, fingerprint);
                return Ok(ReconcileOutcome::UpToDate { fingerprint });
            }
            zko_info!(
                context = log,
                "pod spec changed on {}: {} -> {}",
                reason,
                applied.fingerprint,
                fingerprint
            );
        }

        self.applier.set_spec(&desired)?;
        self.store.save(&AppliedSpecRecord::new(desired)?)?;
        zko_info!(
            context = log,
            "pod spec applied on {} ({}, {} peers)",
            reason,
            fingerprint,
            membership.peer_count
        );
        Ok(ReconcileOutcome::Applied { fingerprint })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_message_joins_keys() {
        let missing = vec!["zookeeper_image_path".to_owned(), "leader-port".to_owned()];
        assert_eq!(
            missing_config_message(&missing),
            "missing config zookeeper_image_path;missing config leader-port"
        );
    }

    #[test]
    fn outcomes_map_to_status() {
        assert_eq!(
            ReconcileOutcome::NotLeader.status(),
            UnitStatus::active("follower, standing by")
        );
        assert_eq!(
            ReconcileOutcome::Applied {
                fingerprint: "ab".into()
            }
            .status(),
            UnitStatus::active("ready")
        );
        let err = ReconcileError::ApplyFailed(ApplyError::Rejected("quota".into()));
        assert_eq!(
            err.status(),
            UnitStatus::blocked("pod spec apply failed: orchestrator rejected pod spec: quota")
        );
    }
}
