//! ---
//! zko_section: "01-core-functionality"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Shared primitives and utilities for the operator runtime."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "ZKO_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Available log formats for the hook runner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Keeps the background log writers alive. Dropping it flushes every pending line, so
/// the hook runner holds it until the process exits.
#[must_use = "dropping the guard flushes and stops the log writers"]
pub struct LogGuard {
    _stdout: WorkerGuard,
    _file: WorkerGuard,
}

/// Resolves the filter directive: `ZKO_LOG`, then `RUST_LOG`, then `info`.
fn env_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); defaulting to {}",
                LOG_ENV, err, DEFAULT_DIRECTIVE
            );
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

/// Initialize the tracing subscriber for one hook invocation.
///
/// Stdout receives JSON or pretty output per [`LogFormat`]; a daily rolling JSON
/// file is always written under the configured directory. A hook process is
/// short-lived, so the returned [`LogGuard`] must outlive the dispatch.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<LogGuard> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config
        .file_prefix
        .clone()
        .unwrap_or_else(|| service_name.to_owned());

    let file_appender = daily(&config.directory, format!("{}.log", prefix));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let fmt_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };

    let file_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(service = %service_name, log_dir = %config.directory.display(), format = ?config.format, "tracing initialised");
    Ok(LogGuard {
        _stdout: stdout_guard,
        _file: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_guard_flushes_last_event() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().to_path_buf(),
            format: LogFormat::Pretty,
            file_prefix: Some("hook".into()),
        };

        let guard = init_tracing("zkod", &config).unwrap();
        tracing::info!(event = "hook.dispatch", "final outcome line");
        drop(guard);

        let contents: String = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect();
        assert!(contents.contains("final outcome line"));
    }
}
