//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Leader-gated reconciliation and hook lifecycle management."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use tracing::debug;
use zko_cluster::RelationEvent;
use zko_common::RelationsConfig;
use zko_logging::{log_hook_event, HookEventOutcome};
use zko_persistence::StateStore;

use crate::context::HookContext;
use crate::events::HookEvent;
use crate::publisher::{ConnectionPublisher, PublishOutcome};
use crate::reconciler::{missing_config_message, ReconcileOutcome, Reconciler, TriggerReason};
use crate::substrate::{PodSpecApplier, RelationDataWriter, StatusSink, UnitStatus};

/// Result of handling one hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Status to report; `None` when the hook changed nothing.
    pub status: Option<UnitStatus>,
    /// The substrate must re-deliver this event later.
    pub deferred: bool,
}

struct Handled {
    status: Option<UnitStatus>,
    deferred: bool,
    outcome: HookEventOutcome,
    message: String,
}

impl Handled {
    fn ignored(message: impl Into<String>) -> Self {
        Self {
            status: None,
            deferred: false,
            outcome: HookEventOutcome::Handled,
            message: message.into(),
        }
    }

    fn fault(status: UnitStatus) -> Self {
        let message = status.message().to_owned();
        Self {
            status: Some(status),
            deferred: false,
            outcome: HookEventOutcome::Fault,
            message,
        }
    }
}

/// Routes hook events to the reconciler or the connection publisher.
pub struct Operator<S, A, W> {
    reconciler: Reconciler<S, A>,
    publisher: ConnectionPublisher<W>,
    relations: RelationsConfig,
}

impl<S, A, W> Operator<S, A, W>
where
    S: StateStore,
    A: PodSpecApplier,
    W: RelationDataWriter,
{
    pub fn new(
        reconciler: Reconciler<S, A>,
        publisher: ConnectionPublisher<W>,
        relations: RelationsConfig,
    ) -> Self {
        Self {
            reconciler,
            publisher,
            relations,
        }
    }

    pub fn relations(&self) -> &RelationsConfig {
        &self.relations
    }

    pub fn dispatch(
        &mut self,
        ctx: &HookContext<'_>,
        event: &HookEvent,
        status: &mut dyn StatusSink,
    ) -> DispatchOutcome {
        let hook = event.name(&self.relations);
        let (relation, handled) = match event {
            HookEvent::ConfigChanged => (None, self.reconcile(ctx, TriggerReason::ConfigChanged)),
            HookEvent::Start => (None, self.reconcile(ctx, TriggerReason::Start)),
            HookEvent::UpgradeCharm => (None, self.reconcile(ctx, TriggerReason::Upgrade)),
            HookEvent::PeerRelation { kind, remote_unit } => {
                let relation_event = RelationEvent::new(*kind, remote_unit.clone());
                let handled = match self.reconciler.tracker().on_relation_event(&relation_event) {
                    Some(signal) => {
                        debug!(kind = %signal.kind, remote = %signal.remote_unit, "members changed");
                        self.reconcile(ctx, TriggerReason::MembersChanged)
                    }
                    None => Handled::ignored("no membership change"),
                };
                (Some(self.relations.peer.clone()), handled)
            }
            HookEvent::ClientRelationJoined { relation_id, .. } => (
                Some(self.relations.client.clone()),
                self.publish(ctx, *relation_id),
            ),
        };

        if let Some(next) = &handled.status {
            status.set_status(next);
        }

        let mut log_ctx = ctx.log_context().with_hook(&hook);
        if let Some(relation) = relation.as_deref() {
            log_ctx = log_ctx.with_relation(relation);
        }
        log_hook_event(Some(&log_ctx), "hook.dispatch", &handled.message, handled.outcome);

        DispatchOutcome {
            status: handled.status,
            deferred: handled.deferred,
        }
    }

    fn reconcile(&mut self, ctx: &HookContext<'_>, reason: TriggerReason) -> Handled {
        match self.reconciler.reconcile(ctx, reason) {
            Ok(outcome) => {
                let message = match &outcome {
                    ReconcileOutcome::NotLeader => "not leader".to_owned(),
                    ReconcileOutcome::ConfigIncomplete { missing } => {
                        missing_config_message(missing)
                    }
                    ReconcileOutcome::UpToDate { .. } => "pod spec up to date".to_owned(),
                    ReconcileOutcome::Applied { fingerprint } => {
                        format!("pod spec applied ({fingerprint})")
                    }
                };
                Handled {
                    status: Some(outcome.status()),
                    deferred: false,
                    outcome: HookEventOutcome::Handled,
                    message,
                }
            }
            Err(err) => Handled::fault(err.status()),
        }
    }

    fn publish(&mut self, ctx: &HookContext<'_>, relation_id: Option<u32>) -> Handled {
        // Followers never read the client port.
        let result = if ctx.is_leader {
            let port = match ctx.config.port("client-port") {
                Ok(port) => port,
                Err(err) => return Handled::fault(UnitStatus::blocked(err.to_string())),
            };
            self.publisher.publish_connection(ctx, relation_id, port, port)
        } else {
            Ok(PublishOutcome::NotLeader)
        };
        match result {
            Ok(outcome) => {
                let deferred = outcome == PublishOutcome::DeferRequested;
                let message = match &outcome {
                    PublishOutcome::NotLeader => "not leader".to_owned(),
                    PublishOutcome::DeferRequested => "cluster relation missing".to_owned(),
                    PublishOutcome::Published(record) => match &record.host {
                        Some(host) => format!("published {host}:{}", record.port),
                        None => format!("published port {} without host", record.port),
                    },
                };
                Handled {
                    status: Some(outcome.status()),
                    deferred,
                    outcome: if deferred {
                        HookEventOutcome::Deferred
                    } else {
                        HookEventOutcome::Handled
                    },
                    message,
                }
            }
            Err(err) => Handled::fault(UnitStatus::blocked(err.to_string())),
        }
    }
}
