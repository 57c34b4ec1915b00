//! Multinet operator CLI
//!
//! Sends one command to the master for the workers listed in a TOML file
//! and prints the per-worker answers.
//!
//! # Usage
//!
//! ```bash
//! multinet-ctl --config multinet.toml init
//! multinet-ctl --config multinet.toml start
//! multinet-ctl --config multinet.toml get-switches
//! multinet-ctl --config multinet.toml stop
//! ```
//!
//! Lifecycle commands exit with the master's status code when any worker
//! fails; `get-switches` and `ping-all` only log the failure.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use multinet_master::{exit_code, MasterClient, OperatorConfig};
use multinet_telemetry::init_logging;
use multinet_types::Command;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Multinet operator CLI
#[derive(Parser, Debug)]
#[command(name = "multinet-ctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the operator configuration file (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Master base URL (overrides config)
    #[arg(long)]
    master: Option<String>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: CtlCommand,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum CtlCommand {
    /// Build the topology on every worker
    Init,
    /// Start the gradual rollout on every worker
    Start,
    /// Count booted switches per worker
    GetSwitches,
    /// Tear the topology down
    Stop,
    /// All-pairs ping within each worker
    PingAll,
    /// Make hosts ping the controller
    DetectHosts,
}

impl From<CtlCommand> for Command {
    fn from(command: CtlCommand) -> Self {
        match command {
            CtlCommand::Init => Command::Init,
            CtlCommand::Start => Command::Start,
            CtlCommand::GetSwitches => Command::GetSwitches,
            CtlCommand::Stop => Command::Stop,
            CtlCommand::PingAll => Command::PingAll,
            CtlCommand::DetectHosts => Command::DetectHosts,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&cli.log_level, None).context("Failed to initialise logging")?;

    let mut config = OperatorConfig::load(&cli.config)?;
    if let Some(master) = &cli.master {
        config.master = master.clone();
    }

    let workers = config.worker_entries()?;
    let command = Command::from(cli.command);
    let client = MasterClient::new(&config.master, Duration::from_millis(config.timeout_ms))
        .context("Failed to create master client")?;

    info!(%command, master = %client.base_url(), workers = workers.len(), "Sending command");

    let reply = match command {
        Command::Init => client.init(&workers, config.topology()?).await,
        other => client.command(other, &workers).await,
    }
    .with_context(|| format!("Failed to send {command} to {}", client.base_url()))?;

    if reply.bodies.len() == workers.len() {
        for (worker, body) in workers.iter().zip(&reply.bodies) {
            println!("{worker}\t{body}");
        }
    } else {
        // The master rejected the request before dispatching.
        for body in &reply.bodies {
            println!("{body}");
        }
    }

    if reply.is_success() {
        info!(%command, status = reply.status, "Command succeeded");
        return Ok(());
    }

    error!(%command, status = reply.status, "Command failed on at least one worker");
    if let Some(code) = exit_code(command, &reply) {
        std::process::exit(code);
    }
    Ok(())
}
