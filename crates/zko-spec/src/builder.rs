//! ---
//! zko_section: "04-configuration-orchestration"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Desired pod spec construction from settings and membership."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use indexmap::IndexMap;
use zko_cluster::MembershipSnapshot;

use crate::error::{Result, SpecError};
use crate::podspec::{
    ContainerPort, ContainerSpec, ImageDetails, KubernetesSpec, PodSpec, Probe, TcpSocketAction,
    VolumeConfig, VolumeFile,
};
use crate::settings::Configuration;
use crate::template::{render, TemplateSet};

/// Shell pipeline run after `ZOO_MY_ID` is exported.
pub const INIT_COMMAND: &str = "cp /scripts/docker-entrypoint.sh /docker-entrypoint.sh && chmod +x /docker-entrypoint.sh && /docker-entrypoint.sh zkServer.sh start-foreground";

const PROBE_TIMEOUT_SECONDS: u32 = 5;
const READINESS_PERIOD_SECONDS: u32 = 5;
const READINESS_INITIAL_DELAY_SECONDS: u32 = 10;
const LIVENESS_INITIAL_DELAY_SECONDS: u32 = 45;

/// Where an environment entry takes its value from.
enum EnvSource {
    Setting(&'static str),
    Standalone,
    Servers,
}

/// Environment entries in the order they appear in the spec.
const ENV_LAYOUT: [(&str, EnvSource); 12] = [
    ("ZOO_TICK_TIME", EnvSource::Setting("tick-time")),
    ("ZOO_INIT_LIMIT", EnvSource::Setting("init-limit")),
    ("ZOO_SYNC_LIMIT", EnvSource::Setting("sync-limit")),
    ("ZOO_MAX_CLIENT_CNXNS", EnvSource::Setting("max-client-cnxns")),
    ("ZOO_STANDALONE_ENABLED", EnvSource::Standalone),
    ("ZOO_ADMINSERVER_ENABLED", EnvSource::Setting("adminserver-enabled")),
    ("ZOO_AUTOPURGE_PURGEINTERVAL", EnvSource::Setting("autopurge-purgeinterval")),
    ("ZOO_AUTOPURGE_SNAPRETAINCOUNT", EnvSource::Setting("autopurge-snapretaincount")),
    ("ZOO_4LW_COMMANDS_WHITELIST", EnvSource::Setting("4lw-commands-whitelist")),
    ("ZOO_CFG_EXTRA", EnvSource::Setting("cfg-extra")),
    ("ZOO_LOG4J_PROP", EnvSource::Setting("log4j-prop")),
    ("ZOO_SERVERS", EnvSource::Servers),
];

/// Resolved port triple used across ports, probes and templates.
#[derive(Debug, Clone, Copy)]
struct Ports {
    client: u16,
    server: u16,
    leader: u16,
}

/// Maps `(settings, membership)` to the desired pod spec. Pure: no I/O, no clock.
#[derive(Debug, Clone)]
pub struct SpecBuilder {
    application: String,
    templates: TemplateSet,
}

impl SpecBuilder {
    pub fn new(application: impl Into<String>, templates: TemplateSet) -> Self {
        Self {
            application: application.into(),
            templates,
        }
    }

    /// Builder over the compiled-in templates.
    pub fn with_bundled_templates(application: impl Into<String>) -> Self {
        Self::new(application, TemplateSet::bundled())
    }

    pub fn build(&self, config: &Configuration, membership: &MembershipSnapshot) -> Result<PodSpec> {
        let ports = Ports {
            client: config.port("client-port")?,
            server: config.port("server-port")?,
            leader: config.port("leader-port")?,
        };
        let env_config = self.env_config(config, membership, ports)?;
        let volume_config = self.volume_config(&env_config, ports)?;

        Ok(PodSpec::new(ContainerSpec {
            name: self.application.clone(),
            image_details: image_details(config)?,
            ports: vec![
                ContainerPort::tcp("client-port", ports.client),
                ContainerPort::tcp("server-port", ports.server),
                ContainerPort::tcp("leader-port", ports.leader),
            ],
            env_config,
            command: command(),
            volume_config,
            kubernetes: kubernetes(ports.client),
        }))
    }

    fn env_config(
        &self,
        config: &Configuration,
        membership: &MembershipSnapshot,
        ports: Ports,
    ) -> Result<IndexMap<String, String>> {
        let mut env = IndexMap::with_capacity(ENV_LAYOUT.len());
        for (name, source) in &ENV_LAYOUT {
            let value = match source {
                EnvSource::Setting(key) => config.text(key)?,
                EnvSource::Standalone => membership.is_standalone().to_string(),
                EnvSource::Servers => self.servers(membership.peer_count, ports),
            };
            env.insert((*name).to_owned(), value);
        }
        Ok(env)
    }

    /// `server.N=<pod>.<app>-endpoints:<server>:<leader>;<client>` for every member.
    fn servers(&self, peer_count: usize, ports: Ports) -> String {
        let app = &self.application;
        (1..=peer_count.max(1))
            .map(|id| {
                format!(
                    "server.{id}={app}-{ordinal}.{app}-endpoints:{server}:{leader};{client}",
                    ordinal = id - 1,
                    server = ports.server,
                    leader = ports.leader,
                    client = ports.client,
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn volume_config(
        &self,
        env: &IndexMap<String, String>,
        ports: Ports,
    ) -> Result<Vec<VolumeConfig>> {
        let mut vars = env.clone();
        vars.insert("ZOO_CLIENT_PORT".to_owned(), ports.client.to_string());
        vars.insert("ZOO_SERVER_PORT".to_owned(), ports.server.to_string());
        vars.insert("ZOO_LEADER_PORT".to_owned(), ports.leader.to_string());

        let conf_files = self
            .templates
            .conf()
            .iter()
            .map(|template| {
                let content = render(&template.body, &vars).map_err(|source| SpecError::Template {
                    file: template.name.clone(),
                    source,
                })?;
                Ok(VolumeFile {
                    path: template.name.clone(),
                    content,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let script_files = self
            .templates
            .scripts()
            .iter()
            .map(|script| VolumeFile {
                path: script.name.clone(),
                content: script.body.clone(),
            })
            .collect();

        Ok(vec![
            VolumeConfig {
                name: "conf".to_owned(),
                mount_path: "/conf".to_owned(),
                files: conf_files,
            },
            VolumeConfig {
                name: "scripts".to_owned(),
                mount_path: "/scripts".to_owned(),
                files: script_files,
            },
        ])
    }
}

fn image_details(config: &Configuration) -> Result<ImageDetails> {
    let image_path = config.text("zookeeper_image_path")?;
    let username = config.text("zookeeper_image_username")?;
    if username.is_empty() {
        return Ok(ImageDetails {
            image_path,
            username: None,
            password: None,
        });
    }
    Ok(ImageDetails {
        image_path,
        username: Some(username),
        password: Some(config.text("zookeeper_image_password")?),
    })
}

fn command() -> Vec<String> {
    vec![
        "sh".to_owned(),
        "-c".to_owned(),
        format!("export ZOO_MY_ID=$((${{HOSTNAME##*-}} + 1)) && {INIT_COMMAND}"),
    ]
}

fn kubernetes(client_port: u16) -> KubernetesSpec {
    KubernetesSpec {
        readiness_probe: Probe {
            tcp_socket: TcpSocketAction { port: client_port },
            timeout_seconds: PROBE_TIMEOUT_SECONDS,
            period_seconds: Some(READINESS_PERIOD_SECONDS),
            initial_delay_seconds: READINESS_INITIAL_DELAY_SECONDS,
        },
        liveness_probe: Probe {
            tcp_socket: TcpSocketAction { port: client_port },
            timeout_seconds: PROBE_TIMEOUT_SECONDS,
            period_seconds: None,
            initial_delay_seconds: LIVENESS_INITIAL_DELAY_SECONDS,
        },
    }
}
