//! In-memory engine state.

use multinet_engine::{
    ControllerHandle, EmulationEngine, EngineError, HostHandle, HostSpec, LinkSpec, PingReport,
    SwitchHandle, SwitchSpec,
};
use multinet_types::SwitchType;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, trace};

/// Events kept by default before the oldest are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Behaviour switches for the in-memory engine.
#[derive(Debug, Clone)]
pub struct MemoryEngineConfig {
    /// Report batch-startup support for every switch kind.
    pub batch_startup: bool,
    /// Require switches to report a controller connection after starting.
    pub connection_wait: bool,
    /// Switch names whose start always fails.
    pub failing_switches: HashSet<String>,
    /// Most recent events retained in the log.
    pub event_capacity: usize,
}

impl Default for MemoryEngineConfig {
    fn default() -> Self {
        Self {
            batch_startup: false,
            connection_wait: false,
            failing_switches: HashSet::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// One call made against the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ControllerAdded(String),
    ControllerStarted(String),
    HostAdded(String),
    SwitchAdded(String),
    LinkAdded(String, String),
    SwitchStarted(String),
    BatchStartup { kind: SwitchType, count: usize },
    PingSent(DetectionPing),
    HostInterrupted(String),
    Cleanup,
}

/// A fire-and-forget ping issued from a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionPing {
    pub host: String,
    pub target: IpAddr,
    pub count: u32,
}

#[derive(Debug)]
struct SwitchRecord {
    handle: SwitchHandle,
    started: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    controllers: BTreeMap<String, (ControllerHandle, bool)>,
    hosts: BTreeMap<String, HostHandle>,
    switches: BTreeMap<String, SwitchRecord>,
    links: Vec<LinkSpec>,
    events: VecDeque<EngineEvent>,
    event_capacity: usize,
}

impl MemoryState {
    fn record(&mut self, event: EngineEvent) {
        if self.event_capacity == 0 {
            return;
        }
        if self.events.len() == self.event_capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn node_exists(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
            || self.hosts.contains_key(name)
            || self.switches.contains_key(name)
    }

    fn ensure_unique(&self, name: &str) -> Result<(), EngineError> {
        if self.node_exists(name) {
            return Err(EngineError::DuplicateNode(name.to_string()));
        }
        Ok(())
    }

    fn any_controller_started(&self) -> bool {
        self.controllers.values().any(|(_, started)| *started)
    }

    /// Hosts reachable from `from` through started switches.
    fn reachable_hosts(&self, from: &str, adjacency: &HashMap<&str, Vec<&str>>) -> HashSet<String> {
        let mut visited: HashSet<&str> = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        let mut hosts = HashSet::new();

        while let Some(node) = queue.pop_front() {
            for &next in adjacency.get(node).map(Vec::as_slice).unwrap_or_default() {
                if !visited.insert(next) {
                    continue;
                }
                if self.hosts.contains_key(next) {
                    // Hosts terminate paths; traffic is never forwarded through them.
                    hosts.insert(next.to_string());
                } else if self.switches.get(next).is_some_and(|s| s.started) {
                    queue.push_back(next);
                }
            }
        }

        hosts
    }
}

/// Emulation engine that keeps everything in memory.
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    config: Arc<MemoryEngineConfig>,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryEngine {
    /// Create an engine with default behaviour.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with the given behaviour switches.
    pub fn with_config(config: MemoryEngineConfig) -> Self {
        let state = MemoryState {
            event_capacity: config.event_capacity,
            ..Default::default()
        };
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// The most recent calls, oldest first. At most
    /// [`event_capacity`](MemoryEngineConfig::event_capacity) are kept.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.state.lock().events.iter().cloned().collect()
    }

    /// Detection pings still present in the event log.
    pub fn detection_pings(&self) -> Vec<DetectionPing> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                EngineEvent::PingSent(ping) => Some(ping.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of switches currently started, in dpid order.
    pub fn started_switches(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut started: Vec<&SwitchHandle> = state
            .switches
            .values()
            .filter(|s| s.started)
            .map(|s| &s.handle)
            .collect();
        started.sort_by_key(|s| s.dpid);
        started.into_iter().map(|s| s.name.clone()).collect()
    }

    /// Number of (controllers, hosts, switches, links) currently present.
    pub fn node_counts(&self) -> (usize, usize, usize, usize) {
        let state = self.state.lock();
        (
            state.controllers.len(),
            state.hosts.len(),
            state.switches.len(),
            state.links.len(),
        )
    }

    /// Whether the engine holds no nodes or links.
    pub fn is_empty(&self) -> bool {
        self.node_counts() == (0, 0, 0, 0)
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::with_config(MemoryEngineConfig::default())
    }
}

impl EmulationEngine for MemoryEngine {
    fn add_controller(
        &mut self,
        name: &str,
        address: SocketAddr,
    ) -> Result<ControllerHandle, EngineError> {
        let mut state = self.state.lock();
        state.ensure_unique(name)?;
        let handle = ControllerHandle {
            name: name.to_string(),
            address,
        };
        state
            .controllers
            .insert(name.to_string(), (handle.clone(), false));
        state.record(EngineEvent::ControllerAdded(name.to_string()));
        Ok(handle)
    }

    fn start_controller(&mut self, controller: &ControllerHandle) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let entry = state
            .controllers
            .get_mut(&controller.name)
            .ok_or_else(|| EngineError::UnknownNode(controller.name.clone()))?;
        entry.1 = true;
        state.record(EngineEvent::ControllerStarted(controller.name.clone()));
        Ok(())
    }

    fn add_host(&mut self, spec: &HostSpec) -> Result<HostHandle, EngineError> {
        let mut state = self.state.lock();
        state.ensure_unique(&spec.name)?;
        let handle = HostHandle {
            name: spec.name.clone(),
            ip: spec.ip,
        };
        state.hosts.insert(spec.name.clone(), handle.clone());
        state.record(EngineEvent::HostAdded(spec.name.clone()));
        Ok(handle)
    }

    fn add_switch(&mut self, spec: &SwitchSpec) -> Result<SwitchHandle, EngineError> {
        let mut state = self.state.lock();
        state.ensure_unique(&spec.name)?;
        let handle = SwitchHandle {
            name: spec.name.clone(),
            dpid: spec.dpid,
            kind: spec.kind,
        };
        state.switches.insert(
            spec.name.clone(),
            SwitchRecord {
                handle: handle.clone(),
                started: false,
            },
        );
        trace!(switch = %spec.name, dpid = %spec.dpid_hex(), "Switch added");
        state.record(EngineEvent::SwitchAdded(spec.name.clone()));
        Ok(handle)
    }

    fn add_link(&mut self, spec: &LinkSpec) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        for node in [&spec.node1, &spec.node2] {
            if !state.node_exists(node) {
                return Err(EngineError::UnknownNode(node.clone()));
            }
        }
        state.links.push(spec.clone());
        state.record(EngineEvent::LinkAdded(spec.node1.clone(), spec.node2.clone()));
        Ok(())
    }

    fn start_switch(
        &mut self,
        switch: &SwitchHandle,
        controllers: &[ControllerHandle],
    ) -> Result<(), EngineError> {
        if self.config.failing_switches.contains(&switch.name) {
            return Err(EngineError::StartFailed {
                node: switch.name.clone(),
                reason: "injected failure".to_string(),
            });
        }

        let mut state = self.state.lock();
        for controller in controllers {
            if !state.controllers.contains_key(&controller.name) {
                return Err(EngineError::UnknownNode(controller.name.clone()));
            }
        }
        let record = state
            .switches
            .get_mut(&switch.name)
            .ok_or_else(|| EngineError::UnknownNode(switch.name.clone()))?;
        record.started = true;
        trace!(switch = %switch.name, dpid = switch.dpid, "Switch started");
        state.record(EngineEvent::SwitchStarted(switch.name.clone()));
        Ok(())
    }

    fn supports_batch_startup(&self, _kind: SwitchType) -> bool {
        self.config.batch_startup
    }

    fn batch_startup(
        &mut self,
        kind: SwitchType,
        switches: &[SwitchHandle],
    ) -> Result<Vec<SwitchHandle>, EngineError> {
        if !self.config.batch_startup {
            return Ok(Vec::new());
        }
        let mut state = self.state.lock();
        let activated: Vec<SwitchHandle> = switches
            .iter()
            .filter(|s| state.switches.get(&s.name).is_some_and(|r| r.started))
            .cloned()
            .collect();
        state.record(EngineEvent::BatchStartup {
            kind,
            count: activated.len(),
        });
        Ok(activated)
    }

    fn requires_connection_wait(&self) -> bool {
        self.config.connection_wait
    }

    fn is_connected(&self, switch: &SwitchHandle) -> bool {
        let state = self.state.lock();
        state.any_controller_started()
            && state.switches.get(&switch.name).is_some_and(|s| s.started)
    }

    fn send_pings(
        &mut self,
        host: &HostHandle,
        target: IpAddr,
        count: u32,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if !state.hosts.contains_key(&host.name) {
            return Err(EngineError::UnknownNode(host.name.clone()));
        }
        state.record(EngineEvent::PingSent(DetectionPing {
            host: host.name.clone(),
            target,
            count,
        }));
        Ok(())
    }

    fn interrupt_host(&mut self, host: &HostHandle) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if !state.hosts.contains_key(&host.name) {
            return Err(EngineError::UnknownNode(host.name.clone()));
        }
        state.record(EngineEvent::HostInterrupted(host.name.clone()));
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        debug!(
            controllers = state.controllers.len(),
            hosts = state.hosts.len(),
            switches = state.switches.len(),
            links = state.links.len(),
            "Cleaning up in-memory topology"
        );
        state.controllers.clear();
        state.hosts.clear();
        state.switches.clear();
        state.links.clear();
        state.record(EngineEvent::Cleanup);
        Ok(())
    }

    fn ping(&mut self, hosts: &[HostHandle]) -> Result<PingReport, EngineError> {
        let state = self.state.lock();
        for host in hosts {
            if !state.hosts.contains_key(&host.name) {
                return Err(EngineError::UnknownNode(host.name.clone()));
            }
        }

        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for link in &state.links {
            adjacency
                .entry(link.node1.as_str())
                .or_default()
                .push(link.node2.as_str());
            adjacency
                .entry(link.node2.as_str())
                .or_default()
                .push(link.node1.as_str());
        }

        let mut report = PingReport::default();
        for source in hosts {
            let reachable = state.reachable_hosts(&source.name, &adjacency);
            for target in hosts.iter().filter(|t| t.name != source.name) {
                report.sent += 1;
                if reachable.contains(&target.name) {
                    report.received += 1;
                }
            }
        }

        trace!(
            sent = report.sent,
            received = report.received,
            "All-pairs ping"
        );
        Ok(report)
    }
}
