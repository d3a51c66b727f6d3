//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Leader-gated reconciliation and hook lifecycle management."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
//! Reconciliation core for the ZooKeeper operator: the leader-gated
//! reconciler, the connection publisher, and hook dispatch.

pub mod context;
pub mod events;
pub mod memory;
pub mod operator;
pub mod publisher;
pub mod reconciler;
pub mod substrate;

pub use context::HookContext;
pub use events::{HookEvent, UnknownHook};
pub use memory::{MemoryPodSpecApplier, MemoryRelationData, MemoryStatus, RelationWrite};
pub use operator::{DispatchOutcome, Operator};
pub use publisher::{ConnectionPublisher, PublishError, PublishOutcome, DEFERRED_STATUS};
pub use reconciler::{
    missing_config_message, ReconcileError, ReconcileOutcome, Reconciler, TriggerReason,
    FOLLOWER_STATUS, READY_STATUS,
};
pub use substrate::{
    ApplyError, ConnectionRecord, PodSpecApplier, RelationDataWriter, RelationWriteError,
    StatusSink, UnitStatus,
};
