//! ---
//! zko_section: "03-persistence-logging"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Applied spec persistence and storage backends."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use std::fs;

use tempfile::tempdir;
use zko_cluster::MembershipSnapshot;
use zko_persistence::{
    AppliedSpecRecord, FileStateStore, MemoryStateStore, PersistenceError, StateStore,
};
use zko_spec::{Configuration, PodSpec, SpecBuilder};

fn spec(peer_count: usize) -> PodSpec {
    let config = Configuration::new().with("zookeeper_image_path", "zookeeper:3.6");
    let membership = MembershipSnapshot {
        joined: peer_count > 1,
        peer_count,
        local_address: None,
    };
    SpecBuilder::with_bundled_templates("zookeeper-k8s")
        .build(&config, &membership)
        .unwrap()
}

#[test]
fn file_store_roundtrip_preserves_record() {
    let dir = tempdir().unwrap();
    let mut store = FileStateStore::in_dir(dir.path());
    let record = AppliedSpecRecord::new(spec(1)).unwrap();

    store.save(&record).unwrap();
    let loaded = store.load().unwrap().expect("record stored");
    assert_eq!(loaded, record);
    assert!(loaded.matches(&spec(1)));
    assert!(!loaded.matches(&spec(2)));
    assert!(!dir.path().join("applied-spec.json.tmp").exists());
}

#[test]
fn file_store_overwrites_previous_record() {
    let dir = tempdir().unwrap();
    let mut store = FileStateStore::in_dir(dir.path());
    store.save(&AppliedSpecRecord::new(spec(1)).unwrap()).unwrap();
    let second = AppliedSpecRecord::new(spec(3)).unwrap();
    store.save(&second).unwrap();

    let reopened = FileStateStore::in_dir(dir.path());
    assert_eq!(reopened.load().unwrap().unwrap().fingerprint, second.fingerprint);
}

#[test]
fn tampered_state_is_rejected() {
    let dir = tempdir().unwrap();
    let mut store = FileStateStore::in_dir(dir.path());
    store.save(&AppliedSpecRecord::new(spec(1)).unwrap()).unwrap();

    let mut envelope: serde_json::Value =
        serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
    envelope["record"]["spec"]["containers"][0]["name"] = serde_json::json!("intruder");
    fs::write(store.path(), serde_json::to_vec_pretty(&envelope).unwrap()).unwrap();

    assert!(matches!(
        store.load(),
        Err(PersistenceError::HashMismatch { .. })
    ));
}

#[test]
fn unknown_envelope_version_is_rejected() {
    let dir = tempdir().unwrap();
    let mut store = FileStateStore::in_dir(dir.path());
    store.save(&AppliedSpecRecord::new(spec(1)).unwrap()).unwrap();

    let mut envelope: serde_json::Value =
        serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
    envelope["version"] = serde_json::json!(42);
    fs::write(store.path(), serde_json::to_vec(&envelope).unwrap()).unwrap();

    assert!(matches!(
        store.load(),
        Err(PersistenceError::UnsupportedVersion(42))
    ));
}

#[test]
fn memory_store_keeps_latest_record() {
    let mut store = MemoryStateStore::new();
    let record = AppliedSpecRecord::new(spec(2)).unwrap();
    store.save(&record).unwrap();

    assert_eq!(store.saves(), 1);
    assert_eq!(store.load().unwrap(), Some(record.clone()));
    assert_eq!(MemoryStateStore::with_record(record).saves(), 0);
}
