//! Control verbs shared by the master and the workers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A command the master can broadcast to every worker.
///
/// Each command maps to a `POST /<route>` endpoint on both the master and
/// the workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Init,
    Start,
    GetSwitches,
    Stop,
    PingAll,
    DetectHosts,
}

impl Command {
    /// All commands, in lifecycle order.
    pub const ALL: [Command; 6] = [
        Command::Init,
        Command::Start,
        Command::GetSwitches,
        Command::Stop,
        Command::PingAll,
        Command::DetectHosts,
    ];

    /// Endpoint path segment on the worker.
    pub fn route(self) -> &'static str {
        match self {
            Command::Init => "init",
            Command::Start => "start",
            Command::GetSwitches => "get_switches",
            Command::Stop => "stop",
            Command::PingAll => "ping_all",
            Command::DetectHosts => "detect_hosts",
        }
    }

    /// Whether the worker only answers once the switch rollout has finished.
    ///
    /// `init` builds every node and `start` paces the whole rollout, so both
    /// need a longer wait than the query commands.
    pub fn is_rollout(self) -> bool {
        matches!(self, Command::Init | Command::Start)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_match_serde_names() {
        for command in Command::ALL {
            let json = serde_json::to_string(&command).unwrap();
            assert_eq!(json, format!("\"{}\"", command.route()));
        }
    }

    #[test]
    fn test_rollout_commands() {
        assert!(Command::Init.is_rollout());
        assert!(Command::Start.is_rollout());
        assert!(!Command::GetSwitches.is_rollout());
        assert!(!Command::Stop.is_rollout());
    }
}
