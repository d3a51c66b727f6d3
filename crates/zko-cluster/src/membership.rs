//! ---
//! zko_section: "07-cluster-membership"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Peer membership tracking from relation signals."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::directory::PeerDirectory;

/// Lifecycle signal raised by the substrate for a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationEventKind {
    Created,
    Joined,
    Changed,
    Departed,
    Broken,
}

impl RelationEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationEventKind::Created => "created",
            RelationEventKind::Joined => "joined",
            RelationEventKind::Changed => "changed",
            RelationEventKind::Departed => "departed",
            RelationEventKind::Broken => "broken",
        }
    }

    /// Kinds that can alter or confirm the peer set.
    fn touches_membership(&self) -> bool {
        matches!(
            self,
            RelationEventKind::Joined | RelationEventKind::Changed | RelationEventKind::Departed
        )
    }
}

impl fmt::Display for RelationEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(RelationEventKind::Created),
            "joined" => Ok(RelationEventKind::Joined),
            "changed" => Ok(RelationEventKind::Changed),
            "departed" => Ok(RelationEventKind::Departed),
            "broken" => Ok(RelationEventKind::Broken),
            other => Err(format!("unknown relation event kind: {}", other)),
        }
    }
}

/// A relation event as delivered to the membership tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEvent {
    pub kind: RelationEventKind,
    /// Remote unit attached to the event; relation-level events carry none.
    pub remote_unit: Option<String>,
}

impl RelationEvent {
    pub fn new(kind: RelationEventKind, remote_unit: Option<String>) -> Self {
        Self { kind, remote_unit }
    }
}

/// Raised when a unit-scoped relation event may have changed the peer set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembersChangedSignal {
    pub kind: RelationEventKind,
    pub remote_unit: String,
}

/// Point-in-time view of the cluster, derived fresh for each reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipSnapshot {
    pub joined: bool,
    /// Remote peers plus this unit; never below one.
    pub peer_count: usize,
    /// `None` until the network binding resolves.
    pub local_address: Option<String>,
}

impl MembershipSnapshot {
    /// Snapshot of a unit with no peer relation yet.
    pub fn solo() -> Self {
        Self {
            joined: false,
            peer_count: 1,
            local_address: None,
        }
    }

    pub fn is_standalone(&self) -> bool {
        self.peer_count == 1
    }
}

/// Derives cluster topology from the peer relation.
#[derive(Debug, Clone)]
pub struct MembershipTracker {
    relation_name: String,
}

impl MembershipTracker {
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            relation_name: relation_name.into(),
        }
    }

    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    /// True iff the peer relation exists for this unit.
    pub fn is_joined(&self, directory: &dyn PeerDirectory) -> bool {
        directory.related_units(&self.relation_name).is_some()
    }

    /// Remote peers on the relation plus one for this unit.
    pub fn peer_count(&self, directory: &dyn PeerDirectory) -> usize {
        directory
            .related_units(&self.relation_name)
            .map_or(1, |units| units.len() + 1)
    }

    /// Ingress address of this unit; resolution failures are logged and yield `None`.
    pub fn local_address(&self, directory: &dyn PeerDirectory) -> Option<String> {
        match directory.ingress_address(&self.relation_name) {
            Ok(address) => Some(address),
            Err(err) => {
                error!(relation = %self.relation_name, error = %err, "cannot get the address");
                None
            }
        }
    }

    /// Like [`Self::local_address`] but an unresolved binding is only a debug event; the
    /// pod spec does not depend on it.
    pub fn snapshot(&self, directory: &dyn PeerDirectory) -> MembershipSnapshot {
        let units = directory.related_units(&self.relation_name);
        let local_address = match directory.ingress_address(&self.relation_name) {
            Ok(address) => Some(address),
            Err(err) => {
                debug!(relation = %self.relation_name, error = %err, "address not resolved yet");
                None
            }
        };
        MembershipSnapshot {
            joined: units.is_some(),
            peer_count: units.map_or(1, |units| units.len() + 1),
            local_address,
        }
    }

    /// Filter relation noise: only unit-scoped joined/changed/departed events signal.
    pub fn on_relation_event(&self, event: &RelationEvent) -> Option<MembersChangedSignal> {
        debug!(
            relation = %self.relation_name,
            kind = %event.kind,
            remote = event.remote_unit.as_deref().unwrap_or("<none>"),
            "peer relation event"
        );
        if !event.kind.touches_membership() {
            return None;
        }
        let remote_unit = event.remote_unit.clone()?;
        Some(MembersChangedSignal {
            kind: event.kind,
            remote_unit,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tracing::Level;
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};
    use tracing_subscriber::Registry;

    use super::*;
    use crate::StaticPeerDirectory;

    #[test]
    fn kind_parses_and_displays() {
        for kind in [
            RelationEventKind::Created,
            RelationEventKind::Joined,
            RelationEventKind::Changed,
            RelationEventKind::Departed,
            RelationEventKind::Broken,
        ] {
            assert_eq!(kind.to_string().parse::<RelationEventKind>(), Ok(kind));
        }
        assert!("renamed".parse::<RelationEventKind>().is_err());
    }

    #[test]
    fn lifecycle_kinds_never_signal() {
        let tracker = MembershipTracker::new("cluster");
        for kind in [RelationEventKind::Created, RelationEventKind::Broken] {
            let event = RelationEvent::new(kind, Some("zk/1".into()));
            assert_eq!(tracker.on_relation_event(&event), None);
        }
    }

    #[derive(Clone, Default)]
    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: layer::Context<'_, S>) {
            if *event.metadata().level() == Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn unresolved_address_is_only_an_error_when_publishing() {
        let counter = ErrorCounter::default();
        let subscriber = Registry::default().with(counter.clone());
        let tracker = MembershipTracker::new("cluster");
        let directory = StaticPeerDirectory::new().with_relation("cluster", ["zk/1"]);

        tracing::subscriber::with_default(subscriber, || {
            let snapshot = tracker.snapshot(&directory);
            assert_eq!(snapshot.local_address, None);
            assert_eq!(counter.0.load(Ordering::SeqCst), 0);

            assert_eq!(tracker.local_address(&directory), None);
            assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn solo_snapshot_is_standalone() {
        let snapshot = MembershipSnapshot::solo();
        assert!(snapshot.is_standalone());
        assert!(!snapshot.joined);
    }
}
