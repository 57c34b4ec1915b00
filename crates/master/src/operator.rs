//! Operator-side configuration and exit policy for `multinet-ctl`.

use crate::client::MasterReply;
use multinet_types::{ip_range, AddressError, Command, TopologyParams};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperatorConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse operator config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid worker range: {0}")]
    Address(#[from] AddressError),

    #[error("No [topology] section; init needs one")]
    MissingTopology,
}

/// A block of workers on consecutive addresses.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerRange {
    pub start_ip: Ipv4Addr,
    pub count: usize,
    /// Port appended to every address; the master's default otherwise.
    #[serde(default)]
    pub port: Option<u16>,
}

/// Contents of the `multinet-ctl` TOML file.
///
/// ```toml
/// master = "http://10.0.0.100:3000"
/// workers = ["10.0.0.1", "10.0.0.2:4000"]
///
/// [worker_range]
/// start_ip = "10.0.1.1"
/// count = 4
///
/// [topology]
/// controller_ip_address = "10.0.0.254"
/// controller_of_port = 6653
/// switch_type = "ovsk"
/// topo_type = "linear"
/// topo_size = 30
/// group_size = 3
/// group_delay = 100
/// hosts_per_switch = 1
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorConfig {
    #[serde(default = "default_master")]
    pub master: String,

    #[serde(default)]
    pub workers: Vec<String>,

    #[serde(default)]
    pub worker_range: Option<WorkerRange>,

    #[serde(default)]
    pub topology: Option<TopologyParams>,

    /// Upper bound on one command, rollout included.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_master() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout_ms() -> u64 {
    3_600_000
}

impl OperatorConfig {
    pub fn load(path: &Path) -> Result<Self, OperatorConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| OperatorConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, OperatorConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Explicit worker entries followed by the expanded range, if any.
    pub fn worker_entries(&self) -> Result<Vec<String>, OperatorConfigError> {
        let mut entries = self.workers.clone();
        if let Some(range) = &self.worker_range {
            for ip in ip_range(range.start_ip, range.count)? {
                entries.push(match range.port {
                    Some(port) => format!("{ip}:{port}"),
                    None => ip.to_string(),
                });
            }
        }
        Ok(entries)
    }

    pub fn topology(&self) -> Result<&TopologyParams, OperatorConfigError> {
        self.topology
            .as_ref()
            .ok_or(OperatorConfigError::MissingTopology)
    }
}

/// Process exit code for a finished command, or `None` to exit normally.
///
/// Failed lifecycle commands exit with the master's status code. Failed
/// queries (`get_switches`, `ping_all`) are only reported.
pub fn exit_code(command: Command, reply: &MasterReply) -> Option<i32> {
    if reply.is_success() {
        return None;
    }
    match command {
        Command::GetSwitches | Command::PingAll => None,
        Command::Init | Command::Start | Command::Stop | Command::DetectHosts => {
            Some(i32::from(reply.status))
        }
    }
}
