//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Leader-gated reconciliation and hook lifecycle management."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use zko_cluster::PeerDirectory;
use zko_logging::LogContext;
use zko_spec::Configuration;

/// Inputs supplied by the substrate for a single hook invocation.
///
/// Leadership is authoritative for this invocation only and is never cached.
#[derive(Clone, Copy)]
pub struct HookContext<'a> {
    pub unit: &'a str,
    pub is_leader: bool,
    pub config: &'a Configuration,
    pub peers: &'a dyn PeerDirectory,
}

impl<'a> HookContext<'a> {
    pub fn new(
        unit: &'a str,
        is_leader: bool,
        config: &'a Configuration,
        peers: &'a dyn PeerDirectory,
    ) -> Self {
        Self {
            unit,
            is_leader,
            config,
            peers,
        }
    }

    pub fn log_context(&self) -> LogContext<'a> {
        LogContext::new()
            .with_unit(self.unit)
            .with_leader(self.is_leader)
    }
}
