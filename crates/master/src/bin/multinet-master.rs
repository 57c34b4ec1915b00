//! Multinet Master
//!
//! Fans operator commands out to workers and aggregates their answers.
//!
//! # Usage
//!
//! ```bash
//! multinet-master --config master.toml
//! multinet-master --listen-addr 0.0.0.0:3000 --worker-port 3333
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [rpc]
//! listen_addr = "0.0.0.0:3000"
//!
//! [workers]
//! default_port = 3333
//!
//! [broadcast]
//! request_timeout_ms = 30000
//! rollout_timeout_ms = 3600000
//!
//! [telemetry]
//! log_file = "/var/log/multinet/master.log"
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use multinet_master::rpc::{MasterState, RpcServer, RpcServerConfig, DEFAULT_MASTER_PORT};
use multinet_master::{BroadcastConfig, Broadcaster};
use multinet_telemetry::{init_logging, shutdown_signal, TelemetryConfig};
use multinet_types::DEFAULT_WORKER_PORT;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Multinet Master
///
/// Broadcasts topology commands to every worker.
#[derive(Parser, Debug)]
#[command(name = "multinet-master")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides config)
    #[arg(long)]
    listen_addr: Option<SocketAddr>,

    /// Port for worker entries that do not name one (overrides config)
    #[arg(long)]
    worker_port: Option<u16>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Path to log file (redirects all logs to this file)
    #[arg(long)]
    logfile: Option<PathBuf>,
}

/// Top-level master configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterConfig {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub workers: WorkersConfig,

    #[serde(default)]
    pub broadcast: BroadcastSection,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

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
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_MASTER_PORT))
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkersConfig {
    #[serde(default = "default_worker_port")]
    pub default_port: u16,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            default_port: default_worker_port(),
        }
    }
}

fn default_worker_port() -> u16 {
    DEFAULT_WORKER_PORT
}

/// Per-request time limits towards workers.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastSection {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Limit for `init` and `start`, which return only once the worker is done.
    #[serde(default = "default_rollout_timeout_ms")]
    pub rollout_timeout_ms: u64,
}

impl Default for BroadcastSection {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            rollout_timeout_ms: default_rollout_timeout_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_rollout_timeout_ms() -> u64 {
    3_600_000
}

impl MasterConfig {
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

        if let Some(port) = cli.worker_port {
            self.workers.default_port = port;
        }

        if let Some(ref logfile) = cli.logfile {
            self.telemetry.log_file = Some(logfile.clone());
        }
    }

    fn broadcast_config(&self) -> BroadcastConfig {
        BroadcastConfig {
            request_timeout: Duration::from_millis(self.broadcast.request_timeout_ms),
            rollout_timeout: Duration::from_millis(self.broadcast.rollout_timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MasterConfig::load(path)?,
        None => MasterConfig::default(),
    };
    config.apply_overrides(&cli);

    let _log_guard = init_logging(&cli.log_level, config.telemetry.log_file.as_deref())
        .context("Failed to initialise logging")?;

    info!(
        listen_addr = %config.rpc.listen_addr,
        worker_port = config.workers.default_port,
        request_timeout_ms = config.broadcast.request_timeout_ms,
        rollout_timeout_ms = config.broadcast.rollout_timeout_ms,
        "Multinet master starting"
    );

    let broadcaster =
        Broadcaster::new(config.broadcast_config()).context("Failed to create broadcaster")?;
    let state = MasterState {
        broadcaster,
        default_port: config.workers.default_port,
    };

    let rpc_handle = RpcServer::new(
        RpcServerConfig {
            listen_addr: config.rpc.listen_addr,
        },
        state,
    )
    .start()
    .await
    .context("Failed to start RPC server")?;

    info!("Master started, press Ctrl+C to stop");
    shutdown_signal().await;

    rpc_handle.abort();
    info!("Master shutdown complete");
    Ok(())
}
