//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Shared primitives and utilities for the operator runtime."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
//! Shared primitives for the ZooKeeper operator workspace.
//! This crate exposes the operator configuration file and tracing setup
//! consumed by the hook runner.

pub mod config;
pub mod logging;

pub use config::{
    LoadedOperatorConfig, LoggingConfig, OperatorConfig, PublishConfig, PublishScope,
    RelationsConfig, StorageConfig, TemplatesConfig, UnitConfig,
};
pub use logging::{init_tracing, LogFormat, LogGuard};
