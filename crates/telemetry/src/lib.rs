//! Process-level plumbing shared by the Multinet server binaries.
//!
//! - [`init_logging`]: `tracing` subscriber on stdout or a log file
//! - [`shutdown_signal`]: resolves on Ctrl+C or SIGTERM
//! - [`TelemetryConfig`]: the `[telemetry]` section of a binary's TOML file
//!
//! Nothing here runs implicitly; each binary calls these from `main`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::signal;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Errors setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log file name: {0}")]
    InvalidLogFile(PathBuf),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// The `[telemetry]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryConfig {
    /// Redirect all logs to this file instead of stdout.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. With a `log_file`, output is
/// written without ANSI colours through a non-blocking writer; keep the
/// returned guard alive until exit or buffered lines are lost.
pub fn init_logging(
    log_level: &str,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>, TelemetryError> {
    let builder = tracing_subscriber::fmt();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let Some(log_file) = log_file else {
        builder
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
        return Ok(None);
    };

    let file_name = log_file
        .file_name()
        .ok_or_else(|| TelemetryError::InvalidLogFile(log_file.to_path_buf()))?
        .to_os_string();
    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory)?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    builder
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
    Ok(Some(guard))
}

/// Resolve once the process is asked to stop.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
