//! ---
//! zko_section: "03-persistence-logging"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Structured logging adapters for hook handlers."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Unit the hook is running for, e.g. `zookeeper-k8s/0`.
    pub unit: Option<&'a str>,
    /// Hook name, e.g. `config-changed`.
    pub hook: Option<&'a str>,
    /// Relation the hook belongs to, if any.
    pub relation: Option<&'a str>,
    /// Leadership as reported by the substrate for this invocation.
    pub leader: Option<bool>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a unit name.
    pub fn with_unit(mut self, unit: &'a str) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Attach a hook name.
    pub fn with_hook(mut self, hook: &'a str) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Attach a relation name.
    pub fn with_relation(mut self, relation: &'a str) -> Self {
        self.relation = Some(relation);
        self
    }

    /// Attach the leadership flag.
    pub fn with_leader(mut self, leader: bool) -> Self {
        self.leader = Some(leader);
        self
    }
}

/// Outcome attached to a hook log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEventOutcome {
    /// The hook ran to completion.
    Handled,
    /// The hook asked the substrate to re-deliver the event later.
    Deferred,
    /// The hook hit a condition that blocks the unit.
    Fault,
}

impl HookEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            HookEventOutcome::Handled => "handled",
            HookEventOutcome::Deferred => "deferred",
            HookEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized hook event with its outcome.
pub fn log_hook_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: HookEventOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    let unit = ctx.unit.unwrap_or("");
    let hook = ctx.hook.unwrap_or("");
    let relation = ctx.relation.unwrap_or("");
    let leader = ctx.leader.unwrap_or_default();
    match outcome {
        HookEventOutcome::Fault => tracing::error!(
            event,
            outcome = outcome.as_str(),
            unit,
            hook,
            relation,
            leader,
            message = %message
        ),
        _ => tracing::info!(
            event,
            outcome = outcome.as_str(),
            unit,
            hook,
            relation,
            leader,
            message = %message
        ),
    }
}
