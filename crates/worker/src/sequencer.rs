//! Gradual bootstrap of a worker's topology.
//!
//! The sequencer owns the worker's [`TopologyInventory`] and drives the
//! engine through the lifecycle:
//!
//! ```text
//! Uninitialized ──init──► Built ──start──► Starting ──► Running
//!       ▲                   │                 │            │
//!       │                   └──────stop───────┴────────────┤
//!       └──── init ◄──── Stopped ◄─────────────────────────┘
//! ```
//!
//! `start` activates switches in groups of `group_size`, sleeping the group
//! delay before every group (the first included), so a remote controller
//! sees connections arrive at a bounded rate.

use crate::inventory::TopologyInventory;
use crate::status::{Phase, SharedStatus};
use multinet_engine::{EmulationEngine, EngineError};
use multinet_types::{ConfigError, TopologyConfig, TopologyRequest};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Pings each host sends towards the controller during host detection.
pub const DEFAULT_PING_COUNT: u32 = 50;

/// Errors from sequencer operations.
#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("Cannot {op} while {phase}")]
    InvalidTransition { op: &'static str, phase: Phase },

    #[error("Invalid topology: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("{pending} switches not connected after {timeout:?}")]
    ConnectionTimeout { pending: usize, timeout: Duration },

    #[error("Rollout cancelled")]
    Cancelled,

    #[error("Unknown host: {0}")]
    UnknownHost(String),
}

/// Tunables that are not part of a topology request.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Send detection pings from every host once the rollout settles.
    pub auto_detect_hosts: bool,
    pub ping_count: u32,
    /// Upper bound on waiting for switches to report a controller connection.
    pub connection_timeout: Duration,
    pub connection_poll_interval: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            auto_detect_hosts: true,
            ping_count: DEFAULT_PING_COUNT,
            connection_timeout: Duration::from_secs(30),
            connection_poll_interval: Duration::from_millis(500),
        }
    }
}

/// Per-worker lifecycle state machine.
pub struct BootstrapSequencer<E> {
    engine: E,
    config: SequencerConfig,
    inventory: Option<TopologyInventory>,
    phase: Phase,
    status: SharedStatus,
}

impl<E: EmulationEngine> BootstrapSequencer<E> {
    pub fn new(engine: E, config: SequencerConfig) -> Self {
        Self {
            engine,
            config,
            inventory: None,
            phase: Phase::Uninitialized,
            status: SharedStatus::new(),
        }
    }

    /// Status handle readable from other tasks.
    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn inventory(&self) -> Option<&TopologyInventory> {
        self.inventory.as_ref()
    }

    /// Switches started since the last `init`. Valid in every phase.
    pub fn get_switches(&self) -> usize {
        self.status.booted()
    }

    fn set_phase(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "Phase transition");
        self.phase = phase;
        self.status.set_phase(phase);
    }

    fn require(&self, op: &'static str, allowed: bool) -> Result<(), SequencerError> {
        if allowed {
            Ok(())
        } else {
            Err(SequencerError::InvalidTransition {
                op,
                phase: self.phase,
            })
        }
    }

    fn running_inventory(&self, op: &'static str) -> Result<&TopologyInventory, SequencerError> {
        self.require(op, self.phase == Phase::Running)?;
        self.inventory
            .as_ref()
            .ok_or(SequencerError::InvalidTransition {
                op,
                phase: self.phase,
            })
    }

    /// Validate `request` and build its nodes and links without starting
    /// anything.
    pub fn init(&mut self, request: &TopologyRequest) -> Result<(), SequencerError> {
        self.require("init", self.phase.accepts_init())?;

        let config = TopologyConfig::validate(request)?;

        let inventory = match TopologyInventory::materialise(&mut self.engine, config) {
            Ok(inventory) => inventory,
            Err(e) => {
                warn!(error = %e, "Failed to build topology, cleaning up");
                if let Err(cleanup) = self.engine.cleanup() {
                    warn!(error = %cleanup, "Cleanup after failed build also failed");
                }
                return Err(e.into());
            }
        };

        info!(
            size = inventory.config.size,
            shape = %inventory.config.shape,
            switch_type = %inventory.config.switch_type,
            dpid_offset = inventory.config.dpid_offset,
            group_size = inventory.config.group_size.get(),
            groups = inventory.config.group_count(),
            group_delay_ms = inventory.config.group_delay.as_millis() as u64,
            "Topology built"
        );

        self.inventory = Some(inventory);
        self.status.reset_booted();
        self.set_phase(Phase::Built);
        Ok(())
    }

    /// Run the gradual rollout.
    ///
    /// Returns once every switch is started, connections are confirmed (if
    /// the engine asks for it) and the settle period has passed. A cancelled
    /// rollout returns [`SequencerError::Cancelled`] and stays `Starting`.
    pub async fn start(&mut self, cancel: &CancellationToken) -> Result<(), SequencerError> {
        self.require("start", self.phase == Phase::Built)?;
        self.set_phase(Phase::Starting);

        let engine = &mut self.engine;
        let status = &self.status;
        let config = &self.config;
        let inventory = self
            .inventory
            .as_mut()
            .ok_or(SequencerError::InvalidTransition {
                op: "start",
                phase: Phase::Starting,
            })?;

        let started_at = Instant::now();

        for controller in &inventory.controllers {
            engine.start_controller(controller)?;
        }

        let group_size = inventory.config.group_size.get();
        let group_delay = inventory.config.group_delay;

        for (index, switch) in inventory.switches.iter().enumerate() {
            if index % group_size == 0 {
                trace!(group = index / group_size, "Waiting before next group");
                pause(group_delay, cancel).await?;
            }
            if cancel.is_cancelled() {
                return Err(SequencerError::Cancelled);
            }

            engine.start_switch(switch, &inventory.controllers)?;
            let booted = status.increment_booted();
            trace!(switch = %switch.name, dpid = switch.dpid, booted, "Switch started");
        }

        for kind in inventory.switch_kinds() {
            if !engine.supports_batch_startup(kind) {
                continue;
            }
            let switches = inventory.switches_of_kind(kind);
            let activated = engine.batch_startup(kind, &switches)?;
            debug!(kind = %kind, requested = switches.len(), activated = activated.len(), "Batch startup");
            inventory.batch_started += activated.len();
        }

        if engine.requires_connection_wait() {
            let deadline = Instant::now() + config.connection_timeout;
            loop {
                let pending = inventory
                    .switches
                    .iter()
                    .filter(|s| !engine.is_connected(s))
                    .count();
                if pending == 0 {
                    break;
                }
                if Instant::now() >= deadline {
                    return Err(SequencerError::ConnectionTimeout {
                        pending,
                        timeout: config.connection_timeout,
                    });
                }
                pause(config.connection_poll_interval, cancel).await?;
            }
        }

        let booted = status.booted();
        self.set_phase(Phase::Running);
        info!(
            booted,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "All switches started"
        );

        // Give the controller time to see the last group before hosts talk.
        if pause(group_delay * 2, cancel).await.is_err() {
            debug!("Settle period interrupted, skipping host detection");
            return Ok(());
        }

        if self.config.auto_detect_hosts {
            self.send_detection_pings()?;
        }
        Ok(())
    }

    fn send_detection_pings(&mut self) -> Result<usize, SequencerError> {
        let Some(inventory) = self.inventory.as_ref() else {
            return Ok(0);
        };
        let target = inventory.config.controller.ip();
        for host in &inventory.hosts {
            self.engine
                .send_pings(host, target, self.config.ping_count)?;
        }
        debug!(hosts = inventory.hosts.len(), target = %target, "Host detection pings sent");
        Ok(inventory.hosts.len())
    }

    /// Make every host ping the controller so it learns host locations.
    /// Returns the number of hosts that sent detection pings.
    pub fn detect_hosts(&mut self) -> Result<usize, SequencerError> {
        self.running_inventory("detect hosts")?;
        self.send_detection_pings()
    }

    /// Tear the topology down and return to a state that accepts `init`.
    pub fn stop(&mut self) -> Result<(), SequencerError> {
        self.require("stop", self.phase.accepts_stop())?;

        if let Some(inventory) = self.inventory.take() {
            for host in &inventory.hosts {
                if let Err(e) = self.engine.interrupt_host(host) {
                    warn!(host = %host.name, error = %e, "Failed to interrupt host");
                }
            }
        }

        let cleanup = self.engine.cleanup();
        self.status.reset_booted();
        self.set_phase(Phase::Stopped);
        info!("Topology stopped");

        cleanup.map_err(SequencerError::from)
    }

    /// All-pairs ping between this worker's hosts. Returns packet loss in
    /// percent.
    pub fn ping_all(&mut self) -> Result<f64, SequencerError> {
        let hosts = self.running_inventory("ping")?.hosts.clone();
        let report = self.engine.ping(&hosts)?;
        Ok(report.packet_loss_percent())
    }

    /// Ping between two hosts addressed as `"<switch>,<host>"`, both
    /// 1-based within this worker. Returns packet loss in percent.
    pub fn ping_pair(&mut self, host1: &str, host2: &str) -> Result<f64, SequencerError> {
        let inventory = self.running_inventory("ping")?;
        let pair = [lookup_host(inventory, host1)?, lookup_host(inventory, host2)?];
        let report = self.engine.ping(&pair)?;
        Ok(report.packet_loss_percent())
    }
}

fn lookup_host(
    inventory: &TopologyInventory,
    address: &str,
) -> Result<multinet_engine::HostHandle, SequencerError> {
    let unknown = || SequencerError::UnknownHost(address.to_string());
    let (switch, host) = address.split_once(',').ok_or_else(unknown)?;
    let switch: u64 = switch.trim().parse().map_err(|_| unknown())?;
    let host: usize = host.trim().parse().map_err(|_| unknown())?;
    inventory.host_at(switch, host).cloned().ok_or_else(unknown)
}

/// Sleep for `duration` unless `cancel` fires first.
async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<(), SequencerError> {
    if duration.is_zero() {
        return if cancel.is_cancelled() {
            Err(SequencerError::Cancelled)
        } else {
            Ok(())
        };
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SequencerError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multinet_engine_memory::{EngineEvent, MemoryEngine, MemoryEngineConfig};
    use multinet_types::TopologyParams;
    use std::collections::HashSet;

    const DELAY_MS: u64 = 100;

    fn params(size: usize, group_size: usize) -> TopologyParams {
        TopologyParams {
            controller_ip_address: "192.168.50.1".to_string(),
            controller_of_port: 6653,
            switch_type: "ovsk".to_string(),
            topo_type: "linear".to_string(),
            topo_size: size,
            group_size,
            group_delay: DELAY_MS,
            hosts_per_switch: 1,
        }
    }

    fn request(size: usize, group_size: usize) -> TopologyRequest {
        params(size, group_size).with_dpid_offset(1)
    }

    fn sequencer(engine: MemoryEngine) -> BootstrapSequencer<MemoryEngine> {
        BootstrapSequencer::new(engine, SequencerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_gradual_rollout_boots_every_switch() {
        let engine = MemoryEngine::new();
        let mut seq = sequencer(engine.clone());
        seq.init(&request(10, 3)).unwrap();
        assert_eq!(seq.phase(), Phase::Built);
        assert_eq!(seq.get_switches(), 0);

        let begin = Instant::now();
        seq.start(&CancellationToken::new()).await.unwrap();
        let elapsed = begin.elapsed();

        assert_eq!(seq.phase(), Phase::Running);
        assert_eq!(seq.get_switches(), 10);
        assert_eq!(engine.started_switches().len(), 10);
        // Four groups plus the settle period.
        assert!(elapsed >= Duration::from_millis(DELAY_MS * 4 + DELAY_MS * 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switches_start_in_plan_order() {
        let engine = MemoryEngine::new();
        let mut seq = sequencer(engine.clone());
        seq.init(&request(5, 2)).unwrap();
        seq.start(&CancellationToken::new()).await.unwrap();

        assert_eq!(engine.started_switches(), ["s1", "s2", "s3", "s4", "s5"]);
        let started: Vec<_> = engine
            .events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::SwitchStarted(name) => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(started, ["s1", "s2", "s3", "s4", "s5"]);
    }

    #[test]
    fn test_zero_group_size_rejected_before_engine_call() {
        let engine = MemoryEngine::new();
        let mut seq = sequencer(engine.clone());
        let err = seq.init(&request(4, 0)).unwrap_err();

        assert!(matches!(err, SequencerError::Config(ConfigError::ZeroGroupSize)));
        assert!(engine.events().is_empty());
        assert_eq!(seq.phase(), Phase::Uninitialized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detection_pings_sent_after_settle() {
        let engine = MemoryEngine::new();
        let mut seq = sequencer(engine.clone());
        seq.init(&request(3, 3)).unwrap();
        seq.start(&CancellationToken::new()).await.unwrap();

        let pings = engine.detection_pings();
        assert_eq!(pings.len(), 3);
        assert!(pings
            .iter()
            .all(|p| p.count == DEFAULT_PING_COUNT && p.target.to_string() == "192.168.50.1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_detect_disabled() {
        let engine = MemoryEngine::new();
        let mut seq = BootstrapSequencer::new(
            engine.clone(),
            SequencerConfig {
                auto_detect_hosts: false,
                ..Default::default()
            },
        );
        seq.init(&request(3, 3)).unwrap();
        seq.start(&CancellationToken::new()).await.unwrap();
        assert!(engine.detection_pings().is_empty());

        assert_eq!(seq.detect_hosts().unwrap(), 3);
        assert_eq!(engine.detection_pings().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_startup_counted_separately() {
        let engine = MemoryEngine::with_config(MemoryEngineConfig {
            batch_startup: true,
            ..Default::default()
        });
        let mut seq = sequencer(engine.clone());
        seq.init(&request(4, 2)).unwrap();
        seq.start(&CancellationToken::new()).await.unwrap();

        assert_eq!(seq.get_switches(), 4);
        assert_eq!(seq.inventory().unwrap().batch_started, 4);
        let batches = engine
            .events()
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::BatchStartup { .. }))
            .count();
        assert_eq!(batches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_wait_succeeds_once_controller_started() {
        let engine = MemoryEngine::with_config(MemoryEngineConfig {
            connection_wait: true,
            ..Default::default()
        });
        let mut seq = sequencer(engine);
        seq.init(&request(3, 1)).unwrap();
        seq.start(&CancellationToken::new()).await.unwrap();
        assert_eq!(seq.phase(), Phase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_leaves_starting() {
        let engine = MemoryEngine::with_config(MemoryEngineConfig {
            failing_switches: HashSet::from(["s3".to_string()]),
            ..Default::default()
        });
        let mut seq = sequencer(engine);
        seq.init(&request(5, 5)).unwrap();

        let err = seq.start(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SequencerError::Engine(EngineError::StartFailed { .. })));
        assert_eq!(seq.phase(), Phase::Starting);
        assert_eq!(seq.get_switches(), 2);

        seq.stop().unwrap();
        assert_eq!(seq.phase(), Phase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_rollout() {
        let engine = MemoryEngine::new();
        let mut seq = sequencer(engine.clone());
        seq.init(&request(10, 2)).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = seq.start(&cancel).await.unwrap_err();
        assert!(matches!(err, SequencerError::Cancelled));
        assert_eq!(seq.phase(), Phase::Starting);
        assert_eq!(seq.get_switches(), 0);
        assert!(engine.started_switches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_restart_is_identical() {
        let engine = MemoryEngine::new();
        let mut seq = sequencer(engine.clone());

        seq.init(&request(6, 4)).unwrap();
        seq.start(&CancellationToken::new()).await.unwrap();
        let first = engine.started_switches();
        let loss = seq.ping_all().unwrap();

        seq.stop().unwrap();
        assert_eq!(seq.get_switches(), 0);
        assert!(engine.is_empty());
        assert!(seq.inventory().is_none());

        seq.init(&request(6, 4)).unwrap();
        seq.start(&CancellationToken::new()).await.unwrap();
        assert_eq!(seq.get_switches(), 6);
        assert_eq!(engine.started_switches(), first);
        assert_eq!(seq.ping_all().unwrap(), loss);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_every_host() {
        let engine = MemoryEngine::new();
        let mut seq = sequencer(engine.clone());
        seq.init(&request(3, 3)).unwrap();
        seq.start(&CancellationToken::new()).await.unwrap();
        seq.stop().unwrap();

        let interrupted = engine
            .events()
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::HostInterrupted(_)))
            .count();
        assert_eq!(interrupted, 3);
        assert_eq!(engine.events().last(), Some(&EngineEvent::Cleanup));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_transitions() {
        let mut seq = sequencer(MemoryEngine::new());
        let cancel = CancellationToken::new();

        assert!(matches!(
            seq.start(&cancel).await,
            Err(SequencerError::InvalidTransition { op: "start", .. })
        ));
        assert!(matches!(seq.stop(), Err(SequencerError::InvalidTransition { .. })));
        assert!(matches!(seq.ping_all(), Err(SequencerError::InvalidTransition { .. })));

        seq.init(&request(2, 1)).unwrap();
        assert!(matches!(
            seq.init(&request(2, 1)),
            Err(SequencerError::InvalidTransition {
                op: "init",
                phase: Phase::Built
            })
        ));
        assert!(matches!(seq.detect_hosts(), Err(SequencerError::InvalidTransition { .. })));

        seq.start(&cancel).await.unwrap();
        assert!(matches!(
            seq.start(&cancel).await,
            Err(SequencerError::InvalidTransition { .. })
        ));
        assert!(matches!(seq.init(&request(2, 1)), Err(SequencerError::InvalidTransition { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_pair() {
        let mut p = params(3, 3);
        p.topo_type = "disconnected".to_string();
        let mut seq = sequencer(MemoryEngine::new());
        seq.init(&p.with_dpid_offset(1)).unwrap();
        seq.start(&CancellationToken::new()).await.unwrap();

        assert_eq!(seq.ping_all().unwrap(), 100.0);
        assert_eq!(seq.ping_pair("1,1", "2,1").unwrap(), 100.0);
        assert!(matches!(
            seq.ping_pair("1,1", "9,1"),
            Err(SequencerError::UnknownHost(h)) if h == "9,1"
        ));
        assert!(matches!(seq.ping_pair("bogus", "1,1"), Err(SequencerError::UnknownHost(_))));

        let mut seq = sequencer(MemoryEngine::new());
        seq.init(&request(3, 3)).unwrap();
        seq.start(&CancellationToken::new()).await.unwrap();
        assert_eq!(seq.ping_pair("1,1", "3,1").unwrap(), 0.0);
    }
}
