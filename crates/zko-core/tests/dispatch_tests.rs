//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Leader-gated reconciliation and hook lifecycle management."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use zko_cluster::{MembershipTracker, RelationEventKind, StaticPeerDirectory};
use zko_common::{PublishScope, RelationsConfig};
use zko_core::{
    ConnectionPublisher, ConnectionRecord, HookContext, HookEvent, MemoryPodSpecApplier,
    MemoryRelationData, MemoryStatus, Operator, PublishOutcome, UnitStatus,
};
use zko_persistence::MemoryStateStore;
use zko_spec::{Configuration, SpecBuilder};

const UNIT: &str = "zookeeper-k8s/0";

struct Harness {
    operator: Operator<MemoryStateStore, MemoryPodSpecApplier, MemoryRelationData>,
    applier: MemoryPodSpecApplier,
    relation_data: MemoryRelationData,
    status: MemoryStatus,
}

fn harness(scope: PublishScope) -> Harness {
    let applier = MemoryPodSpecApplier::new();
    let relation_data = MemoryRelationData::new();
    let relations = RelationsConfig::default();
    let reconciler = zko_core::Reconciler::new(
        SpecBuilder::with_bundled_templates("zookeeper-k8s"),
        MembershipTracker::new(relations.peer.clone()),
        MemoryStateStore::new(),
        applier.clone(),
    );
    let publisher = ConnectionPublisher::new(
        MembershipTracker::new(relations.peer.clone()),
        relations.client.clone(),
        scope,
        relation_data.clone(),
    );
    Harness {
        operator: Operator::new(reconciler, publisher, relations),
        applier,
        relation_data,
        status: MemoryStatus::new(),
    }
}

fn settings() -> Configuration {
    Configuration::new().with("zookeeper_image_path", "zookeeper:3.6")
}

fn client_joined(relation_id: u32) -> HookEvent {
    HookEvent::ClientRelationJoined {
        relation_id: Some(relation_id),
        remote_unit: Some("kafka/0".into()),
    }
}

#[test]
fn publish_defers_until_cluster_relation_exists() {
    let mut h = harness(PublishScope::Unit);
    let config = settings();
    let mut peers = StaticPeerDirectory::new().with_address("cluster", "10.1.0.4");

    {
        let ctx = HookContext::new(UNIT, true, &config, &peers);
        let outcome = h.operator.dispatch(&ctx, &client_joined(4), &mut h.status);
        assert!(outcome.deferred);
        assert_eq!(
            outcome.status,
            Some(UnitStatus::waiting("waiting for cluster relation"))
        );
        assert_eq!(h.relation_data.write_count(), 0);
    }

    peers.join("cluster", "zookeeper-k8s/1");
    let ctx = HookContext::new(UNIT, true, &config, &peers);
    let outcome = h.operator.dispatch(&ctx, &client_joined(4), &mut h.status);
    assert!(!outcome.deferred);
    assert_eq!(h.relation_data.write_count(), 1);

    let write = &h.relation_data.writes()[0];
    assert_eq!(write.relation, "zookeeper");
    assert_eq!(write.relation_id, Some(4));
    assert_eq!(write.scope, PublishScope::Unit);
    assert_eq!(
        write.record,
        ConnectionRecord {
            port: "2181".into(),
            rest_port: "2181".into(),
            host: Some("10.1.0.4".into()),
        }
    );
    assert_eq!(h.status.current(), Some(UnitStatus::active("ready")));
}

#[test]
fn unresolved_address_publishes_without_host() {
    let mut h = harness(PublishScope::Application);
    let config = settings().with("client-port", 2182i64);
    let peers = StaticPeerDirectory::new().with_relation("cluster", Vec::<&str>::new());
    let ctx = HookContext::new(UNIT, true, &config, &peers);

    h.operator.dispatch(&ctx, &client_joined(1), &mut h.status);
    let writes = h.relation_data.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].scope, PublishScope::Application);
    assert_eq!(writes[0].record.port, "2182");
    assert_eq!(writes[0].record.host, None);
}

#[test]
fn followers_never_publish_or_apply() {
    let mut h = harness(PublishScope::Unit);
    let config = settings();
    let peers = StaticPeerDirectory::new()
        .with_relation("cluster", ["zookeeper-k8s/1"])
        .with_address("cluster", "10.1.0.5");
    let ctx = HookContext::new("zookeeper-k8s/1", false, &config, &peers);

    for event in [
        HookEvent::Start,
        HookEvent::ConfigChanged,
        HookEvent::PeerRelation {
            kind: RelationEventKind::Joined,
            remote_unit: Some("zookeeper-k8s/0".into()),
        },
        client_joined(2),
    ] {
        let outcome = h.operator.dispatch(&ctx, &event, &mut h.status);
        assert!(!outcome.deferred);
        assert_eq!(
            outcome.status,
            Some(UnitStatus::active("follower, standing by"))
        );
    }
    assert_eq!(h.applier.apply_count(), 0);
    assert_eq!(h.relation_data.write_count(), 0);

    let bad_port = settings().with("client-port", "nope");
    let ctx = HookContext::new("zookeeper-k8s/1", false, &bad_port, &peers);
    for event in [HookEvent::Start, client_joined(3)] {
        let outcome = h.operator.dispatch(&ctx, &event, &mut h.status);
        assert_eq!(
            outcome.status,
            Some(UnitStatus::active("follower, standing by"))
        );
    }
    assert_eq!(h.relation_data.write_count(), 0);
}

#[test]
fn peer_events_without_remote_unit_do_not_reconcile() {
    let mut h = harness(PublishScope::Unit);
    let config = settings();
    let peers = StaticPeerDirectory::new().with_relation("cluster", Vec::<&str>::new());
    let ctx = HookContext::new(UNIT, true, &config, &peers);

    for kind in [
        RelationEventKind::Created,
        RelationEventKind::Joined,
        RelationEventKind::Changed,
        RelationEventKind::Departed,
    ] {
        let event = HookEvent::PeerRelation {
            kind,
            remote_unit: None,
        };
        let outcome = h.operator.dispatch(&ctx, &event, &mut h.status);
        assert_eq!(outcome.status, None);
    }
    assert_eq!(h.applier.apply_count(), 0);
    assert!(h.status.history().is_empty());
}

#[test]
fn members_changed_reconciles_once_per_real_change() {
    let mut h = harness(PublishScope::Unit);
    let config = settings();
    let mut peers = StaticPeerDirectory::new().with_relation("cluster", Vec::<&str>::new());

    {
        let ctx = HookContext::new(UNIT, true, &config, &peers);
        h.operator.dispatch(&ctx, &HookEvent::Start, &mut h.status);
    }
    assert_eq!(h.applier.apply_count(), 1);

    peers.join("cluster", "zookeeper-k8s/1");
    let ctx = HookContext::new(UNIT, true, &config, &peers);
    let joined = HookEvent::PeerRelation {
        kind: RelationEventKind::Joined,
        remote_unit: Some("zookeeper-k8s/1".into()),
    };
    let changed = HookEvent::PeerRelation {
        kind: RelationEventKind::Changed,
        remote_unit: Some("zookeeper-k8s/1".into()),
    };
    h.operator.dispatch(&ctx, &joined, &mut h.status);
    h.operator.dispatch(&ctx, &changed, &mut h.status);

    assert_eq!(h.applier.apply_count(), 2);
    assert_eq!(h.status.current(), Some(UnitStatus::active("ready")));
}

#[test]
fn missing_image_blocks_unit() {
    let mut h = harness(PublishScope::Unit);
    let config = Configuration::new();
    let peers = StaticPeerDirectory::new();
    let ctx = HookContext::new(UNIT, true, &config, &peers);

    let outcome = h
        .operator
        .dispatch(&ctx, &HookEvent::ConfigChanged, &mut h.status);
    assert_eq!(
        outcome.status,
        Some(UnitStatus::blocked("missing config zookeeper_image_path"))
    );
    assert_eq!(h.applier.apply_count(), 0);
}

#[test]
fn invalid_client_port_blocks_publish() {
    let mut h = harness(PublishScope::Unit);
    let config = settings().with("client-port", "two-one-eight-one");
    let peers = StaticPeerDirectory::new().with_relation("cluster", Vec::<&str>::new());
    let ctx = HookContext::new(UNIT, true, &config, &peers);

    let outcome = h.operator.dispatch(&ctx, &client_joined(9), &mut h.status);
    assert_eq!(outcome.status.map(|s| s.name()), Some("blocked"));
    assert_eq!(h.relation_data.write_count(), 0);
}

#[test]
fn direct_publish_reports_outcome() {
    let relation_data = MemoryRelationData::new();
    let mut publisher = ConnectionPublisher::new(
        MembershipTracker::new("cluster"),
        "zookeeper",
        PublishScope::Unit,
        relation_data.clone(),
    );
    let config = settings();
    let peers = StaticPeerDirectory::new();
    let ctx = HookContext::new(UNIT, true, &config, &peers);

    assert_eq!(
        publisher.publish_connection(&ctx, None, 2181, 2181).unwrap(),
        PublishOutcome::DeferRequested
    );
    assert_eq!(relation_data.write_count(), 0);
}
