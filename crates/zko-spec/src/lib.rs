//! ---
//! zko_section: "04-configuration-orchestration"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Desired pod spec construction from settings and membership."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
//! Charm settings, pod spec value types, and the deterministic builder
//! mapping `(settings, membership)` to the desired pod spec.

pub mod builder;
pub mod error;
pub mod podspec;
pub mod settings;
pub mod template;

pub use builder::{SpecBuilder, INIT_COMMAND};
pub use error::{Result, SpecError, TemplateError};
pub use podspec::{
    ContainerPort, ContainerSpec, ImageDetails, KubernetesSpec, PodSpec, Probe, Protocol,
    TcpSocketAction, VolumeConfig, VolumeFile, POD_SPEC_VERSION,
};
pub use settings::{charm_default, Configuration, SettingValue, REQUIRED_SETTINGS};
pub use template::{render, TemplateFile, TemplateSet};
