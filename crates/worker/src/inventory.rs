//! The per-worker record of what the engine has materialised.

use multinet_engine::{
    ControllerHandle, EmulationEngine, EngineError, HostHandle, LinkSpec, SwitchHandle,
    TopologyPlan,
};
use multinet_types::{SwitchType, TopologyConfig};
use std::collections::BTreeSet;
use tracing::debug;

/// Name given to the single remote controller of a worker.
pub const CONTROLLER_NAME: &str = "c0";

/// Controllers, hosts, switches and links of the live topology.
#[derive(Debug, Clone)]
pub struct TopologyInventory {
    pub config: TopologyConfig,
    pub controllers: Vec<ControllerHandle>,
    pub hosts: Vec<HostHandle>,
    /// Switches in rollout order.
    pub switches: Vec<SwitchHandle>,
    pub links: Vec<LinkSpec>,
    /// Switches reported active by batch startup. Tracked apart from the
    /// per-switch booted counter.
    pub batch_started: usize,
}

impl TopologyInventory {
    /// Plan the topology for `config` and ask the engine to create it.
    ///
    /// Nothing is started. On error the engine may hold a partial topology;
    /// the caller is expected to clean it up.
    pub fn materialise<E: EmulationEngine>(
        engine: &mut E,
        config: TopologyConfig,
    ) -> Result<Self, EngineError> {
        let plan = TopologyPlan::build(&config);

        let controller = engine.add_controller(CONTROLLER_NAME, config.controller)?;

        let hosts = plan
            .hosts
            .iter()
            .map(|spec| engine.add_host(spec))
            .collect::<Result<Vec<_>, _>>()?;

        let switches = plan
            .switches
            .iter()
            .map(|spec| engine.add_switch(spec))
            .collect::<Result<Vec<_>, _>>()?;

        for link in &plan.links {
            engine.add_link(link)?;
        }

        debug!(
            hosts = hosts.len(),
            switches = switches.len(),
            links = plan.links.len(),
            fabric_links = plan.fabric_link_count(),
            shape = %config.shape,
            "Topology materialised"
        );

        Ok(Self {
            config,
            controllers: vec![controller],
            hosts,
            switches,
            links: plan.links,
            batch_started: 0,
        })
    }

    /// Distinct switch kinds present, in a stable order.
    pub fn switch_kinds(&self) -> BTreeSet<SwitchType> {
        self.switches.iter().map(|s| s.kind).collect()
    }

    pub fn switches_of_kind(&self, kind: SwitchType) -> Vec<SwitchHandle> {
        self.switches
            .iter()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect()
    }

    /// Look up host `host` (1-based) on the `switch`-th switch (1-based).
    pub fn host_at(&self, switch: u64, host: usize) -> Option<&HostHandle> {
        if switch as usize > self.config.size || host > self.config.hosts_per_switch {
            return None;
        }
        let name = TopologyPlan::host_name_at(self.config.dpid_offset, switch, host)?;
        self.hosts.iter().find(|h| h.name == name)
    }
}
