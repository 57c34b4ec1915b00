//! Worker actor.
//!
//! A single task owns the [`BootstrapSequencer`] and serves requests from an
//! mpsc channel one at a time, so lifecycle transitions never interleave.
//! Replies travel back on per-request oneshot channels.
//!
//! Two things bypass the queue:
//!
//! - the booted counter and phase, read from [`SharedStatus`];
//! - rollout cancellation: [`WorkerHandle::stop`] cancels the in-flight
//!   rollout's token before queueing the stop, so a long `start` does not
//!   hold the stop back until it finishes.

use crate::sequencer::{BootstrapSequencer, SequencerConfig, SequencerError};
use crate::status::{Phase, SharedStatus};
use multinet_engine::EmulationEngine;
use multinet_types::TopologyRequest;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default depth of the request queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, SequencerError>>;

/// Errors returned through a [`WorkerHandle`].
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
    #[error("Worker channel closed")]
    ChannelClosed,
    #[error("Request dropped")]
    RequestDropped,
}

/// Requests served by the worker actor.
#[derive(Debug)]
pub enum WorkerRequest {
    Init {
        request: TopologyRequest,
        response_tx: Reply<()>,
    },
    Start {
        cancel: CancellationToken,
        response_tx: Reply<()>,
    },
    Stop {
        response_tx: Reply<()>,
    },
    PingAll {
        response_tx: Reply<f64>,
    },
    PingPair {
        host1: String,
        host2: String,
        response_tx: Reply<f64>,
    },
    DetectHosts {
        response_tx: Reply<usize>,
    },
}

impl WorkerRequest {
    fn name(&self) -> &'static str {
        match self {
            WorkerRequest::Init { .. } => "init",
            WorkerRequest::Start { .. } => "start",
            WorkerRequest::Stop { .. } => "stop",
            WorkerRequest::PingAll { .. } => "ping_all",
            WorkerRequest::PingPair { .. } => "ping_pair",
            WorkerRequest::DetectHosts { .. } => "detect_hosts",
        }
    }
}

/// The actor owning a worker's sequencer.
pub struct WorkerRunner<E> {
    sequencer: BootstrapSequencer<E>,
    requests_rx: mpsc::Receiver<WorkerRequest>,
}

impl<E: EmulationEngine> WorkerRunner<E> {
    /// Create the actor and a handle for talking to it.
    pub fn new(engine: E, config: SequencerConfig) -> (Self, WorkerHandle) {
        Self::with_capacity(engine, config, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(
        engine: E,
        config: SequencerConfig,
        capacity: usize,
    ) -> (Self, WorkerHandle) {
        let sequencer = BootstrapSequencer::new(engine, config);
        let (requests_tx, requests_rx) = mpsc::channel(capacity);
        let handle = WorkerHandle {
            requests_tx,
            status: sequencer.status(),
            rollout: Arc::new(Mutex::new(CancellationToken::new())),
        };
        (
            Self {
                sequencer,
                requests_rx,
            },
            handle,
        )
    }

    /// Spawn the actor onto the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Serve requests until every handle is dropped.
    pub async fn run(mut self) {
        info!("Worker runner started");
        while let Some(request) = self.requests_rx.recv().await {
            debug!(request = request.name(), phase = %self.sequencer.phase(), "Handling request");
            self.handle(request).await;
        }
        info!("Worker runner stopped");
    }

    async fn handle(&mut self, request: WorkerRequest) {
        let delivered = match request {
            WorkerRequest::Init {
                request,
                response_tx,
            } => response_tx.send(self.sequencer.init(&request)).is_ok(),
            WorkerRequest::Start {
                cancel,
                response_tx,
            } => {
                let result = self.sequencer.start(&cancel).await;
                if let Err(e) = &result {
                    warn!(error = %e, "Rollout did not complete");
                }
                response_tx.send(result).is_ok()
            }
            WorkerRequest::Stop { response_tx } => response_tx.send(self.sequencer.stop()).is_ok(),
            WorkerRequest::PingAll { response_tx } => {
                response_tx.send(self.sequencer.ping_all()).is_ok()
            }
            WorkerRequest::PingPair {
                host1,
                host2,
                response_tx,
            } => response_tx
                .send(self.sequencer.ping_pair(&host1, &host2))
                .is_ok(),
            WorkerRequest::DetectHosts { response_tx } => {
                response_tx.send(self.sequencer.detect_hosts()).is_ok()
            }
        };

        if !delivered {
            debug!("Requester went away before the reply");
        }
    }
}

/// Cloneable handle to a running [`WorkerRunner`].
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    requests_tx: mpsc::Sender<WorkerRequest>,
    status: SharedStatus,
    /// Token for rollouts queued from now on. Replaced on every stop.
    rollout: Arc<Mutex<CancellationToken>>,
}

impl WorkerHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> WorkerRequest,
    ) -> Result<T, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.requests_tx
            .send(build(tx))
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;
        let result = rx.await.map_err(|_| WorkerError::RequestDropped)?;
        Ok(result?)
    }

    pub async fn init(&self, request: TopologyRequest) -> Result<(), WorkerError> {
        self.request(|response_tx| WorkerRequest::Init {
            request,
            response_tx,
        })
        .await
    }

    /// Run the rollout. Resolves when it completes, fails or is cancelled
    /// by [`stop`](Self::stop).
    pub async fn start(&self) -> Result<(), WorkerError> {
        let cancel = self.rollout.lock().clone();
        self.request(|response_tx| WorkerRequest::Start {
            cancel,
            response_tx,
        })
        .await
    }

    /// Cancel any rollout queued or in flight, then tear the topology down.
    pub async fn stop(&self) -> Result<(), WorkerError> {
        let previous = std::mem::replace(&mut *self.rollout.lock(), CancellationToken::new());
        previous.cancel();
        self.request(|response_tx| WorkerRequest::Stop { response_tx })
            .await
    }

    pub async fn ping_all(&self) -> Result<f64, WorkerError> {
        self.request(|response_tx| WorkerRequest::PingAll { response_tx })
            .await
    }

    pub async fn ping_pair(
        &self,
        host1: impl Into<String>,
        host2: impl Into<String>,
    ) -> Result<f64, WorkerError> {
        let (host1, host2) = (host1.into(), host2.into());
        self.request(|response_tx| WorkerRequest::PingPair {
            host1,
            host2,
            response_tx,
        })
        .await
    }

    pub async fn detect_hosts(&self) -> Result<usize, WorkerError> {
        self.request(|response_tx| WorkerRequest::DetectHosts { response_tx })
            .await
    }

    /// Switches started so far. Never waits for the actor.
    pub fn get_switches(&self) -> usize {
        self.status.booted()
    }

    pub fn phase(&self) -> Phase {
        self.status.phase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multinet_engine_memory::MemoryEngine;
    use multinet_types::{ConfigError, TopologyParams};
    use std::time::Duration;

    const DELAY_MS: u64 = 200;

    fn request(size: usize, group_size: usize) -> TopologyRequest {
        TopologyParams {
            controller_ip_address: "127.0.0.1".to_string(),
            controller_of_port: 6653,
            switch_type: "ovsk".to_string(),
            topo_type: "mesh".to_string(),
            topo_size: size,
            group_size,
            group_delay: DELAY_MS,
            hosts_per_switch: 1,
        }
        .with_dpid_offset(1)
    }

    fn spawn_worker() -> (WorkerHandle, MemoryEngine) {
        let engine = MemoryEngine::new();
        let (runner, handle) = WorkerRunner::new(engine.clone(), SequencerConfig::default());
        runner.spawn();
        (handle, engine)
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_visible_during_rollout() {
        let (handle, _engine) = spawn_worker();
        handle.init(request(10, 3)).await.unwrap();

        let starter = handle.clone();
        let rollout = tokio::spawn(async move { starter.start().await });

        let mut samples = Vec::new();
        tokio::time::sleep(Duration::from_millis(DELAY_MS / 4)).await;
        while !rollout.is_finished() {
            samples.push(handle.get_switches());
            tokio::time::sleep(Duration::from_millis(DELAY_MS / 2)).await;
        }
        rollout.await.unwrap().unwrap();

        assert!(samples.windows(2).all(|w| w[0] <= w[1]), "{samples:?}");
        assert!(samples.iter().any(|&n| n > 0 && n < 10), "{samples:?}");
        assert_eq!(handle.get_switches(), 10);
        assert_eq!(handle.phase(), Phase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_rollout() {
        let (handle, engine) = spawn_worker();
        handle.init(request(20, 2)).await.unwrap();

        let starter = handle.clone();
        let rollout = tokio::spawn(async move { starter.start().await });

        // Let a few groups go out.
        tokio::time::sleep(Duration::from_millis(DELAY_MS * 3 + DELAY_MS / 2)).await;
        assert!(handle.get_switches() > 0);

        handle.stop().await.unwrap();
        let result = rollout.await.unwrap();
        assert!(matches!(
            result,
            Err(WorkerError::Sequencer(SequencerError::Cancelled))
        ));
        assert_eq!(handle.phase(), Phase::Stopped);
        assert_eq!(handle.get_switches(), 0);
        assert!(engine.is_empty());

        // A fresh rollout is not affected by the earlier cancellation.
        handle.init(request(4, 2)).await.unwrap();
        handle.start().await.unwrap();
        assert_eq!(handle.get_switches(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_pass_through() {
        let (handle, _engine) = spawn_worker();
        assert!(matches!(
            handle.start().await,
            Err(WorkerError::Sequencer(SequencerError::InvalidTransition { .. }))
        ));
        assert!(matches!(
            handle.init(request(3, 0)).await,
            Err(WorkerError::Sequencer(SequencerError::Config(_)))
        ));
        assert_eq!(handle.phase(), Phase::Uninitialized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_offset_leaves_worker_serving() {
        let (handle, engine) = spawn_worker();
        let mut bad = request(2, 1);
        bad.dpid_offset = u64::MAX;

        assert!(matches!(
            handle.init(bad).await,
            Err(WorkerError::Sequencer(SequencerError::Config(
                ConfigError::DpidOutOfRange { .. }
            )))
        ));
        assert!(engine.events().is_empty());

        handle.init(request(2, 1)).await.unwrap();
        handle.start().await.unwrap();
        assert_eq!(handle.get_switches(), 2);
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let (runner, handle) = WorkerRunner::new(MemoryEngine::new(), SequencerConfig::default());
        drop(runner);
        assert!(matches!(
            handle.ping_all().await,
            Err(WorkerError::ChannelClosed)
        ));
    }
}
