//! ---
//! zko_section: "07-cluster-membership"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Peer membership tracking from relation signals."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to resolve a network binding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("no network binding named '{0}'")]
    UnknownBinding(String),
    #[error("binding '{binding}' has no ingress address: {reason}")]
    NoIngressAddress { binding: String, reason: String },
}

/// Read-only view of relation state exposed by the hook substrate.
pub trait PeerDirectory {
    /// Remote units bound to `relation`, or `None` when the relation does not exist.
    fn related_units(&self, relation: &str) -> Option<Vec<String>>;

    /// Ingress address of this unit on the network binding named `binding`.
    fn ingress_address(&self, binding: &str) -> Result<String, BindingError>;
}

/// Fixed relation state, used by tests and the local hook runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticPeerDirectory {
    #[serde(default)]
    pub relations: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub addresses: IndexMap<String, String>,
}

impl StaticPeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `relation` with the given remote units.
    pub fn with_relation<I, S>(mut self, relation: impl Into<String>, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations
            .insert(relation.into(), units.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_address(mut self, binding: impl Into<String>, address: impl Into<String>) -> Self {
        self.addresses.insert(binding.into(), address.into());
        self
    }

    /// Add a remote unit, creating the relation when needed.
    pub fn join(&mut self, relation: &str, unit: impl Into<String>) {
        let unit = unit.into();
        let units = self.relations.entry(relation.to_owned()).or_default();
        if !units.contains(&unit) {
            units.push(unit);
        }
    }

    /// Remove a remote unit; the relation itself stays.
    pub fn depart(&mut self, relation: &str, unit: &str) {
        if let Some(units) = self.relations.get_mut(relation) {
            units.retain(|existing| existing != unit);
        }
    }
}

impl PeerDirectory for StaticPeerDirectory {
    fn related_units(&self, relation: &str) -> Option<Vec<String>> {
        self.relations.get(relation).cloned()
    }

    fn ingress_address(&self, binding: &str) -> Result<String, BindingError> {
        match self.addresses.get(binding) {
            Some(address) if !address.is_empty() => Ok(address.clone()),
            Some(_) => Err(BindingError::NoIngressAddress {
                binding: binding.to_owned(),
                reason: "address not yet assigned".to_owned(),
            }),
            None => Err(BindingError::UnknownBinding(binding.to_owned())),
        }
    }
}
