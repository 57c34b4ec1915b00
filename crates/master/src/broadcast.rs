//! Concurrent fan-out of one command to every worker.
//!
//! Every worker gets its own task, all spawned before any is awaited. Each
//! task reports `(index, outcome)` and the outcome lands in that worker's
//! slot, so the returned vector lines up with the input list no matter which
//! worker answers first. A slow or dead worker only affects its own slot.

use crate::outcome::{Outcome, TransportFailure, WorkerOutcome};
use multinet_types::{
    allocate_ranges, max_workers, Command, IdentifierRange, TopologyParams, TopologyRequest,
    WorkerDescriptor, MAX_DPID,
};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Errors constructing a [`Broadcaster`].
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Per-request time limits.
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Limit for query and teardown commands.
    pub request_timeout: Duration,
    /// Limit for `init` and `start`, which block on the worker until the
    /// topology is built or fully rolled out.
    pub rollout_timeout: Duration,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            rollout_timeout: Duration::from_secs(3600),
        }
    }
}

impl BroadcastConfig {
    pub fn timeout_for(&self, command: Command) -> Duration {
        if command.is_rollout() {
            self.rollout_timeout
        } else {
            self.request_timeout
        }
    }
}

/// Sends commands to workers over HTTP.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    client: Client,
    config: BroadcastConfig,
}

impl Broadcaster {
    pub fn new(config: BroadcastConfig) -> Result<Self, BroadcastError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    /// Send a body-less command to every worker.
    ///
    /// `init` needs topology parameters; use
    /// [`broadcast_init`](Self::broadcast_init) for it.
    pub async fn broadcast(
        &self,
        workers: &[WorkerDescriptor],
        command: Command,
    ) -> Vec<WorkerOutcome> {
        let bodies = vec![None; workers.len()];
        self.dispatch(workers, command, bodies).await
    }

    /// Send `init` to every worker. Worker `i` receives the shared
    /// parameters unchanged plus the `i`-th allocated dpid offset.
    pub async fn broadcast_init(
        &self,
        workers: &[WorkerDescriptor],
        params: &TopologyParams,
    ) -> Vec<WorkerOutcome> {
        let ranges = allocate_ranges(workers.len());

        let rejected = unaddressable(&ranges, params.topo_size);
        if let Some(&first) = rejected.first() {
            warn!(
                first_worker = %workers[first],
                workers = rejected.len(),
                max_workers = max_workers(params.topo_size),
                max_dpid = MAX_DPID,
                "Worker dpid blocks exceed the dpid space; those workers will reject init"
            );
        }

        let bodies = ranges
            .iter()
            .map(|range| Some(params.with_dpid_offset(range.base)))
            .collect();
        self.dispatch(workers, Command::Init, bodies).await
    }

    async fn dispatch(
        &self,
        workers: &[WorkerDescriptor],
        command: Command,
        bodies: Vec<Option<TopologyRequest>>,
    ) -> Vec<WorkerOutcome> {
        let timeout = self.config.timeout_for(command);
        info!(%command, workers = workers.len(), ?timeout, "Broadcasting");

        let mut tasks = JoinSet::new();
        for (index, (worker, body)) in workers.iter().zip(bodies).enumerate() {
            let client = self.client.clone();
            let url = format!("{}/{}", worker.base_url(), command.route());
            tasks.spawn(async move { (index, send(client, url, body, timeout).await) });
        }

        let mut slots: Vec<Option<Outcome>> = vec![None; workers.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!(%command, error = %e, "Dispatch task failed"),
            }
        }

        let outcomes: Vec<WorkerOutcome> = workers
            .iter()
            .zip(slots)
            .map(|(worker, slot)| WorkerOutcome {
                worker: worker.clone(),
                outcome: slot.unwrap_or_else(|| {
                    Outcome::Failure(TransportFailure::TaskFailed(
                        "task ended without an outcome".to_string(),
                    ))
                }),
            })
            .collect();

        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            debug!(%command, worker = %outcome.worker, body = %outcome.body_text(), "Worker did not succeed");
        }

        outcomes
    }
}

/// Workers whose block cannot hold `switches` switches below [`MAX_DPID`].
fn unaddressable(ranges: &[IdentifierRange], switches: usize) -> Vec<usize> {
    if switches == 0 {
        return Vec::new();
    }
    ranges
        .iter()
        .filter(|range| range.dpid(switches as u64 - 1) > MAX_DPID)
        .map(|range| range.worker_index)
        .collect()
}

async fn send(
    client: Client,
    url: String,
    body: Option<TopologyRequest>,
    timeout: Duration,
) -> Outcome {
    let mut request = client.post(&url);
    if let Some(body) = &body {
        request = request.json(body);
    }

    let exchange = async {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok::<_, reqwest::Error>((status, text))
    };

    match tokio::time::timeout(timeout, exchange).await {
        Err(_) => Outcome::Failure(TransportFailure::Timeout(timeout)),
        Ok(Err(e)) if e.is_connect() => Outcome::Failure(TransportFailure::Connect(e.to_string())),
        Ok(Err(e)) if e.is_timeout() => Outcome::Failure(TransportFailure::Timeout(timeout)),
        Ok(Err(e)) => Outcome::Failure(TransportFailure::Transport(e.to_string())),
        Ok(Ok((status, body))) => Outcome::Response { status, body },
    }
}
