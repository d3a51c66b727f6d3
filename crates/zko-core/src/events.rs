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
use zko_cluster::RelationEventKind;
use zko_common::RelationsConfig;

/// Hooks the operator reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    ConfigChanged,
    Start,
    UpgradeCharm,
    PeerRelation {
        kind: RelationEventKind,
        remote_unit: Option<String>,
    },
    ClientRelationJoined {
        relation_id: Option<u32>,
        remote_unit: Option<String>,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognised hook '{0}'")]
pub struct UnknownHook(pub String);

impl HookEvent {
    /// Parse a hook name such as `cluster-relation-joined` against the configured relation names.
    pub fn parse(
        name: &str,
        relations: &RelationsConfig,
        remote_unit: Option<String>,
        relation_id: Option<u32>,
    ) -> Result<Self, UnknownHook> {
        match name {
            "config-changed" => return Ok(HookEvent::ConfigChanged),
            "start" => return Ok(HookEvent::Start),
            "upgrade-charm" => return Ok(HookEvent::UpgradeCharm),
            _ => {}
        }

        let peer_prefix = format!("{}-relation-", relations.peer);
        if let Some(kind) = name.strip_prefix(&peer_prefix) {
            let kind = kind
                .parse::<RelationEventKind>()
                .map_err(|_| UnknownHook(name.to_owned()))?;
            return Ok(HookEvent::PeerRelation { kind, remote_unit });
        }

        if name == format!("{}-relation-joined", relations.client) {
            return Ok(HookEvent::ClientRelationJoined {
                relation_id,
                remote_unit,
            });
        }

        Err(UnknownHook(name.to_owned()))
    }

    /// Hook name as the substrate spells it.
    pub fn name(&self, relations: &RelationsConfig) -> String {
        match self {
            HookEvent::ConfigChanged => "config-changed".to_owned(),
            HookEvent::Start => "start".to_owned(),
            HookEvent::UpgradeCharm => "upgrade-charm".to_owned(),
            HookEvent::PeerRelation { kind, .. } => {
                format!("{}-relation-{}", relations.peer, kind)
            }
            HookEvent::ClientRelationJoined { .. } => {
                format!("{}-relation-joined", relations.client)
            }
        }
    }
}
