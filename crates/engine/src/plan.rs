//! Node and link planning for each topology shape.

use crate::node::{HostSpec, LinkSpec, SwitchSpec};
use multinet_types::{TopologyConfig, TopologyShape};
use std::net::Ipv4Addr;

/// The concrete node and link sets for one worker's topology.
///
/// Switch `i` gets dpid `dpid_offset + i` and is named `s<dpid>`. Host `j`
/// (1-based) on that switch is named `h<dpid>_<j>` and addressed
/// `10.<dpid / 256>.<dpid % 256>.<j>`, so names and addresses never collide
/// across workers with disjoint dpid ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopologyPlan {
    /// Hosts, grouped by switch in switch order.
    pub hosts: Vec<HostSpec>,
    /// Switches in rollout order.
    pub switches: Vec<SwitchSpec>,
    /// Host-to-switch links followed by switch-to-switch links.
    pub links: Vec<LinkSpec>,
}

impl TopologyPlan {
    /// Resolve the node and link sets for a validated config.
    pub fn build(config: &TopologyConfig) -> Self {
        let switches: Vec<SwitchSpec> = (0..config.size as u64)
            .map(|i| {
                let dpid = config.dpid_offset + i;
                SwitchSpec {
                    name: switch_name(dpid),
                    dpid,
                    kind: config.switch_type,
                }
            })
            .collect();

        let mut hosts = Vec::with_capacity(config.size * config.hosts_per_switch);
        let mut links = Vec::new();

        for switch in &switches {
            for j in 1..=config.hosts_per_switch {
                let host = HostSpec {
                    name: host_name(switch.dpid, j),
                    ip: host_ip(switch.dpid, j),
                    switch: switch.name.clone(),
                };
                links.push(LinkSpec::new(&host.name, &switch.name));
                hosts.push(host);
            }
        }

        links.extend(switch_links(config.shape, &switches));

        Self {
            hosts,
            switches,
            links,
        }
    }

    /// Name of host `host` (1-based) on the `switch`-th switch (1-based) of
    /// a plan starting at `dpid_offset`.
    pub fn host_name_at(dpid_offset: u64, switch: u64, host: usize) -> Option<String> {
        if switch == 0 || host == 0 {
            return None;
        }
        Some(host_name(dpid_offset + switch - 1, host))
    }

    /// Number of switch-to-switch links in the plan.
    pub fn fabric_link_count(&self) -> usize {
        self.links.len() - self.hosts.len()
    }
}

fn switch_name(dpid: u64) -> String {
    format!("s{dpid}")
}

fn host_name(dpid: u64, index: usize) -> String {
    format!("h{dpid}_{index}")
}

fn host_ip(dpid: u64, index: usize) -> Ipv4Addr {
    // dpid <= MAX_DPID and index <= MAX_HOSTS_PER_SWITCH after validation.
    Ipv4Addr::new(10, (dpid >> 8) as u8, (dpid & 0xff) as u8, index as u8)
}

fn switch_links(shape: TopologyShape, switches: &[SwitchSpec]) -> Vec<LinkSpec> {
    let chain = || {
        switches
            .windows(2)
            .map(|pair| LinkSpec::new(&pair[0].name, &pair[1].name))
    };

    match shape {
        TopologyShape::Disconnected => Vec::new(),
        TopologyShape::Linear => chain().collect(),
        TopologyShape::Ring => {
            let mut links: Vec<LinkSpec> = chain().collect();
            // Two switches are already joined by the chain.
            if switches.len() > 2 {
                let first = &switches[0];
                let last = &switches[switches.len() - 1];
                links.push(LinkSpec::new(&last.name, &first.name));
            }
            links
        }
        TopologyShape::Mesh => {
            let mut links = Vec::new();
            for (i, a) in switches.iter().enumerate() {
                for b in &switches[i + 1..] {
                    links.push(LinkSpec::new(&a.name, &b.name));
                }
            }
            links
        }
    }
}
