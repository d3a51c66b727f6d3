//! ---
//! zko_section: "07-cluster-membership"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Peer membership tracking from relation signals."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
//! Peer membership tracking for ZooKeeper units.

mod directory;
mod membership;

pub use directory::{BindingError, PeerDirectory, StaticPeerDirectory};
pub use membership::{
    MembersChangedSignal, MembershipSnapshot, MembershipTracker, RelationEvent,
    RelationEventKind,
};
