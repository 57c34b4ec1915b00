//! HTTP client for the master API.

use multinet_types::{Command, TopologyParams};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0} needs topology parameters; use MasterClient::init")]
    NeedsTopology(Command),
}

/// The master's answer to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterReply {
    pub status: u16,
    /// One body per worker, in request order. Holds the raw response text
    /// instead when the master rejected the request itself.
    pub bodies: Vec<String>,
}

impl MasterReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for driving a master.
pub struct MasterClient {
    base_url: String,
    client: Client,
}

impl MasterClient {
    /// Create a client for the master at `base_url` (e.g. `http://10.0.0.1:3000`).
    ///
    /// `timeout` bounds a whole command, including the master's wait on
    /// its workers.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the topology on every worker.
    pub async fn init(
        &self,
        workers: &[String],
        params: &TopologyParams,
    ) -> Result<MasterReply, ClientError> {
        self.post(&init_path(params), workers).await
    }

    /// Send any command other than `init`.
    pub async fn command(
        &self,
        command: Command,
        workers: &[String],
    ) -> Result<MasterReply, ClientError> {
        if command == Command::Init {
            return Err(ClientError::NeedsTopology(command));
        }
        self.post(&format!("/{}", command.route()), workers).await
    }

    /// Check whether the master is up.
    pub async fn is_healthy(&self) -> bool {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await;

        matches!(response, Ok(r) if r.status().is_success())
    }

    async fn post(&self, path: &str, workers: &[String]) -> Result<MasterReply, ClientError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(workers)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let bodies = serde_json::from_str::<Vec<String>>(&text).unwrap_or_else(|_| vec![text]);

        Ok(MasterReply { status, bodies })
    }
}

/// Path of the master `init` route for `params`.
pub fn init_path(params: &TopologyParams) -> String {
    format!(
        "/init/controller/{}/port/{}/switch/{}/topology/{}/size/{}/group/{}/delay/{}/hosts/{}",
        params.controller_ip_address,
        params.controller_of_port,
        params.switch_type,
        params.topo_type,
        params.topo_size,
        params.group_size,
        params.group_delay,
        params.hosts_per_switch,
    )
}
