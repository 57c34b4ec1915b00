//! Request and response bodies of the master API.

use serde::{Deserialize, Serialize};

/// Response for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Path parameters of the master `init` route.
#[derive(Debug, Clone, Deserialize)]
pub struct InitPath {
    pub ip: String,
    pub port: u16,
    pub switch_type: String,
    pub topo: String,
    pub size: usize,
    pub group: usize,
    pub delay: u64,
    pub hosts: usize,
}
