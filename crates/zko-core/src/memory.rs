//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Leader-gated reconciliation and hook lifecycle management."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
//! In-memory substrate doubles. Clones share state so a caller can keep a
//! handle after moving one into a reconciler or publisher.
use std::sync::Arc;

use parking_lot::Mutex;
use zko_common::PublishScope;
use zko_spec::PodSpec;

use crate::substrate::{
    ApplyError, ConnectionRecord, PodSpecApplier, RelationDataWriter, RelationWriteError,
    StatusSink, UnitStatus,
};

#[derive(Debug, Default)]
struct ApplierInner {
    applied: Vec<PodSpec>,
    fail_next: Option<ApplyError>,
}

/// Records every spec handed to it.
#[derive(Debug, Clone, Default)]
pub struct MemoryPodSpecApplier {
    inner: Arc<Mutex<ApplierInner>>,
}

impl MemoryPodSpecApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `set_spec` call fail with `error`.
    pub fn fail_next(&self, error: ApplyError) {
        self.inner.lock().fail_next = Some(error);
    }

    pub fn apply_count(&self) -> usize {
        self.inner.lock().applied.len()
    }

    pub fn applied(&self) -> Vec<PodSpec> {
        self.inner.lock().applied.clone()
    }

    pub fn last(&self) -> Option<PodSpec> {
        self.inner.lock().applied.last().cloned()
    }
}

impl PodSpecApplier for MemoryPodSpecApplier {
    fn set_spec(&mut self, spec: &PodSpec) -> Result<(), ApplyError> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_next.take() {
            return Err(err);
        }
        inner.applied.push(spec.clone());
        Ok(())
    }
}

/// One captured relation write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationWrite {
    pub relation: String,
    pub relation_id: Option<u32>,
    pub scope: PublishScope,
    pub record: ConnectionRecord,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRelationData {
    writes: Arc<Mutex<Vec<RelationWrite>>>,
}

impl MemoryRelationData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<RelationWrite> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }
}

impl RelationDataWriter for MemoryRelationData {
    fn write(
        &mut self,
        relation: &str,
        relation_id: Option<u32>,
        scope: PublishScope,
        record: &ConnectionRecord,
    ) -> Result<(), RelationWriteError> {
        self.writes.lock().push(RelationWrite {
            relation: relation.to_owned(),
            relation_id,
            scope,
            record: record.clone(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStatus {
    history: Arc<Mutex<Vec<UnitStatus>>>,
}

impl MemoryStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<UnitStatus> {
        self.history.lock().last().cloned()
    }

    pub fn history(&self) -> Vec<UnitStatus> {
        self.history.lock().clone()
    }
}

impl StatusSink for MemoryStatus {
    fn set_status(&mut self, status: &UnitStatus) {
        self.history.lock().push(status.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_recorded_writes() {
        let data = MemoryRelationData::new();
        let mut writer = data.clone();
        writer
            .write(
                "zookeeper",
                Some(3),
                PublishScope::Unit,
                &ConnectionRecord::new(2181, 2181, None),
            )
            .unwrap();
        assert_eq!(data.write_count(), 1);
        assert_eq!(data.writes()[0].relation_id, Some(3));
    }

    #[test]
    fn status_tracks_latest() {
        let status = MemoryStatus::new();
        let mut sink = status.clone();
        sink.set_status(&UnitStatus::waiting("waiting for cluster relation"));
        sink.set_status(&UnitStatus::active("ready"));
        assert_eq!(status.current(), Some(UnitStatus::active("ready")));
        assert_eq!(status.history().len(), 2);
    }
}
