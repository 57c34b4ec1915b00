//! Multinet Worker
//!
//! Serves the worker HTTP API on top of an emulation engine.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: listen on 0.0.0.0:3333
//! multinet-worker
//!
//! # With a configuration file and a different port
//! multinet-worker --config worker.toml --listen-addr 0.0.0.0:4000
//! ```
//!
//! # Configuration
//!
//! Every section and field is optional. Example TOML:
//!
//! ```toml
//! [rpc]
//! listen_addr = "0.0.0.0:3333"
//!
//! [bootstrap]
//! auto_detect_hosts = true
//! ping_count = 50
//! connection_timeout_ms = 30000
//! connection_poll_ms = 500
//!
//! [engine]
//! batch_startup = false
//! connection_wait = false
//!
//! [telemetry]
//! log_file = "/var/log/multinet/worker.log"
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use multinet_engine_memory::{MemoryEngine, MemoryEngineConfig};
use multinet_telemetry::{init_logging, shutdown_signal, TelemetryConfig};
use multinet_types::DEFAULT_WORKER_PORT;
use multinet_worker::rpc::{RpcServer, RpcServerConfig};
use multinet_worker::{SequencerConfig, WorkerRunner, DEFAULT_PING_COUNT};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Multinet Worker
///
/// Builds and gradually starts one slice of a distributed emulated topology.
#[derive(Parser, Debug)]
#[command(name = "multinet-worker")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides config)
    #[arg(long)]
    listen_addr: Option<SocketAddr>,

    /// Do not ping the controller from hosts after a rollout (overrides config)
    #[arg(long)]
    no_auto_detect: bool,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Path to log file (redirects all logs to this file)
    #[arg(long)]
    logfile: Option<PathBuf>,
}

/// Top-level worker configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_WORKER_PORT))
}

/// Rollout tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_auto_detect_hosts")]
    pub auto_detect_hosts: bool,

    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// How long to wait for switches to connect, when the engine asks for it.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    #[serde(default = "default_connection_poll_ms")]
    pub connection_poll_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            auto_detect_hosts: default_auto_detect_hosts(),
            ping_count: default_ping_count(),
            connection_timeout_ms: default_connection_timeout_ms(),
            connection_poll_ms: default_connection_poll_ms(),
        }
    }
}

fn default_auto_detect_hosts() -> bool {
    true
}

fn default_ping_count() -> u32 {
    DEFAULT_PING_COUNT
}

fn default_connection_timeout_ms() -> u64 {
    30_000
}

fn default_connection_poll_ms() -> u64 {
    500
}

/// Engine behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub batch_startup: bool,

    #[serde(default)]
    pub connection_wait: bool,
}

impl WorkerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply CLI overrides to the configuration.
    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(addr) = cli.listen_addr {
            self.rpc.listen_addr = addr;
        }

        if cli.no_auto_detect {
            self.bootstrap.auto_detect_hosts = false;
        }

        if let Some(ref logfile) = cli.logfile {
            self.telemetry.log_file = Some(logfile.clone());
        }
    }

    fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            auto_detect_hosts: self.bootstrap.auto_detect_hosts,
            ping_count: self.bootstrap.ping_count,
            connection_timeout: Duration::from_millis(self.bootstrap.connection_timeout_ms),
            connection_poll_interval: Duration::from_millis(self.bootstrap.connection_poll_ms),
        }
    }

    fn engine_config(&self) -> MemoryEngineConfig {
        MemoryEngineConfig {
            batch_startup: self.engine.batch_startup,
            connection_wait: self.engine.connection_wait,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => WorkerConfig::load(path)?,
        None => WorkerConfig::default(),
    };
    config.apply_overrides(&cli);

    let _log_guard = init_logging(&cli.log_level, config.telemetry.log_file.as_deref())
        .context("Failed to initialise logging")?;

    info!(
        listen_addr = %config.rpc.listen_addr,
        auto_detect_hosts = config.bootstrap.auto_detect_hosts,
        batch_startup = config.engine.batch_startup,
        connection_wait = config.engine.connection_wait,
        "Multinet worker starting"
    );

    let engine = MemoryEngine::with_config(config.engine_config());
    let (runner, worker) = WorkerRunner::new(engine, config.sequencer_config());
    let runner_task = runner.spawn();

    let server = RpcServer::new(
        RpcServerConfig {
            listen_addr: config.rpc.listen_addr,
        },
        worker.clone(),
    );
    let rpc_handle = server
        .start()
        .await
        .context("Failed to start RPC server")?;

    info!("Worker started, press Ctrl+C to stop");
    shutdown_signal().await;

    if worker.phase().accepts_stop() {
        info!("Tearing down active topology...");
        if let Err(e) = worker.stop().await {
            warn!(error = %e, "Failed to stop topology during shutdown");
        }
    }

    rpc_handle.abort();
    // Open connections may still hold worker handles.
    runner_task.abort();

    info!("Worker shutdown complete");
    Ok(())
}
