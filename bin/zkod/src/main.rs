//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "binary"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Binary entrypoint for the local hook runner."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use zko_cluster::MembershipTracker;
use zko_common::{init_tracing, OperatorConfig};
use zko_core::{
    ConnectionPublisher, HookContext, HookEvent, Operator, Reconciler, StatusSink,
};
use zko_persistence::FileStateStore;
use zko_spec::{SpecBuilder, TemplateSet};

mod local;

use local::{
    DeferredQueue, Environment, JsonRelationData, JsonStatusFile, QueuedEvent, YamlPodSpecApplier,
};

type LocalOperator = Operator<FileStateStore, YamlPodSpecApplier, JsonRelationData>;

#[derive(Debug, Parser)]
#[command(author, about = "ZooKeeper operator hook runner", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Dispatch one hook, replaying deferred hooks first")]
    Hook {
        /// Hook name, e.g. `config-changed` or `cluster-relation-joined`.
        event: String,
        #[arg(long, value_name = "UNIT", help = "Remote unit attached to a relation hook")]
        remote_unit: Option<String>,
        #[arg(long, value_name = "ID", help = "Relation id of a relation hook")]
        relation_id: Option<u32>,
    },
    #[command(about = "Print the pod spec the current settings and peers would produce")]
    ShowSpec,
    #[command(about = "Print version information")]
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Commands::Version = cli.command {
        println!("zkod {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/zko.toml"));
    candidates.push(PathBuf::from("configs/example.toml"));

    let loaded = OperatorConfig::load_with_source(&candidates)?;
    let config = loaded.config;
    let _log_guard = init_tracing("zkod", &config.logging)?;
    info!(config_path = %loaded.source.display(), unit = %config.unit.name, "configuration loaded");

    match cli.command {
        Commands::Hook {
            event,
            remote_unit,
            relation_id,
        } => run_hook(
            &config,
            QueuedEvent {
                name: event,
                remote_unit,
                relation_id,
            },
        ),
        Commands::ShowSpec => show_spec(&config),
        Commands::Version => Ok(()),
    }
}

fn templates(config: &OperatorConfig) -> Result<TemplateSet> {
    match &config.templates.directory {
        Some(dir) => TemplateSet::load(dir)
            .with_context(|| format!("failed to load templates from {}", dir.display())),
        None => Ok(TemplateSet::bundled()),
    }
}

fn build_operator(config: &OperatorConfig, state_dir: &Path) -> Result<LocalOperator> {
    let relations = config.relations.clone();
    let reconciler = Reconciler::new(
        SpecBuilder::new(config.unit.application.clone(), templates(config)?),
        MembershipTracker::new(relations.peer.clone()),
        FileStateStore::in_dir(state_dir),
        YamlPodSpecApplier::new(state_dir),
    );
    let publisher = ConnectionPublisher::new(
        MembershipTracker::new(relations.peer.clone()),
        relations.client.clone(),
        config.publish.scope,
        JsonRelationData::new(state_dir, &config.unit.name, &config.unit.application),
    );
    Ok(Operator::new(reconciler, publisher, relations))
}

fn run_hook(config: &OperatorConfig, incoming: QueuedEvent) -> Result<()> {
    let state_dir = config.storage.state_dir.clone();
    let environment = Environment::load(&config.environment_path())?;
    let settings = config.charm_configuration();
    let ctx = HookContext::new(
        &config.unit.name,
        environment.leader,
        &settings,
        &environment.peers,
    );

    // Reject an unknown hook before touching the deferred queue.
    HookEvent::parse(
        &incoming.name,
        &config.relations,
        incoming.remote_unit.clone(),
        incoming.relation_id,
    )?;

    let mut operator = build_operator(config, &state_dir)?;
    let mut status = JsonStatusFile::new(&state_dir, &config.unit.name);
    let queue = DeferredQueue::new(&state_dir);

    let mut pending = queue.load()?;
    pending.push(incoming);
    let mut still_deferred = Vec::new();
    for queued in pending {
        if dispatch_one(&mut operator, &ctx, &queued, &mut status)? {
            still_deferred.push(queued);
        }
    }
    queue.store(&still_deferred)?;
    if !still_deferred.is_empty() {
        info!(count = still_deferred.len(), "hooks deferred");
    }
    Ok(())
}

/// Returns whether the hook asked to be re-delivered.
fn dispatch_one(
    operator: &mut LocalOperator,
    ctx: &HookContext<'_>,
    queued: &QueuedEvent,
    status: &mut dyn StatusSink,
) -> Result<bool> {
    let event = match HookEvent::parse(
        &queued.name,
        operator.relations(),
        queued.remote_unit.clone(),
        queued.relation_id,
    ) {
        Ok(event) => event,
        Err(err) => {
            warn!(hook = %queued.name, error = %err, "dropping queued hook");
            return Ok(false);
        }
    };
    let outcome = operator.dispatch(ctx, &event, status);
    if let Some(next) = &outcome.status {
        println!("{}: {}", queued.name, next);
    }
    Ok(outcome.deferred)
}

fn show_spec(config: &OperatorConfig) -> Result<()> {
    let environment = Environment::load(&config.environment_path())?;
    let settings = config.charm_configuration();
    let missing = settings.missing_required();
    if !missing.is_empty() {
        return Err(anyhow!(zko_core::missing_config_message(&missing)));
    }
    let membership = MembershipTracker::new(config.relations.peer.clone())
        .snapshot(&environment.peers);
    let spec = SpecBuilder::new(config.unit.application.clone(), templates(config)?)
        .build(&settings, &membership)?;
    info!(fingerprint = %spec.fingerprint()?, peers = membership.peer_count, "pod spec built");
    print!("{}", serde_yaml::to_string(&spec)?);
    Ok(())
}
