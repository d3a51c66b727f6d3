//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Leader-gated reconciliation and hook lifecycle management."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use thiserror::Error;
use zko_cluster::MembershipTracker;
use zko_common::PublishScope;
use zko_logging::{zko_debug, zko_info, zko_warn};

use crate::context::HookContext;
use crate::reconciler::{FOLLOWER_STATUS, READY_STATUS};
use crate::substrate::{ConnectionRecord, RelationDataWriter, RelationWriteError, UnitStatus};

pub const DEFERRED_STATUS: &str = "waiting for cluster relation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    NotLeader,
    /// The peer relation does not exist yet; the caller re-delivers the event later.
    DeferRequested,
    Published(ConnectionRecord),
}

impl PublishOutcome {
    pub fn status(&self) -> UnitStatus {
        match self {
            PublishOutcome::NotLeader => UnitStatus::active(FOLLOWER_STATUS),
            PublishOutcome::DeferRequested => UnitStatus::waiting(DEFERRED_STATUS),
            PublishOutcome::Published(_) => UnitStatus::active(READY_STATUS),
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to publish connection data: {0}")]
    Write(#[from] RelationWriteError),
}

/// Writes this unit's client endpoint into the client relation once the cluster is joined.
pub struct ConnectionPublisher<W> {
    tracker: MembershipTracker,
    relation: String,
    scope: PublishScope,
    writer: W,
}

impl<W: RelationDataWriter> ConnectionPublisher<W> {
    pub fn new(
        tracker: MembershipTracker,
        relation: impl Into<String>,
        scope: PublishScope,
        writer: W,
    ) -> Self {
        Self {
            tracker,
            relation: relation.into(),
            scope,
            writer,
        }
    }

    pub fn publish_connection(
        &mut self,
        ctx: &HookContext<'_>,
        relation_id: Option<u32>,
        port: u16,
        rest_port: u16,
    ) -> Result<PublishOutcome, PublishError> {
        let log = ctx.log_context().with_relation(&self.relation);
        if !ctx.is_leader {
            zko_debug!(context = log, "not leader; skipping publish");
            return Ok(PublishOutcome::NotLeader);
        }

        if !self.tracker.is_joined(ctx.peers) {
            zko_info!(
                context = log,
                "{} relation missing; deferring publish",
                self.tracker.relation_name()
            );
            return Ok(PublishOutcome::DeferRequested);
        }

        let host = self.tracker.local_address(ctx.peers);
        if host.is_none() {
            zko_warn!(context = log, "publishing without host");
        }
        let record = ConnectionRecord::new(port, rest_port, host);
        self.writer
            .write(&self.relation, relation_id, self.scope, &record)?;
        zko_info!(
            context = log,
            "connection data published (relation id {:?}, scope {:?}, port {})",
            relation_id,
            self.scope,
            record.port
        );
        Ok(PublishOutcome::Published(record))
    }
}
