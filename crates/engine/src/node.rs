//! Node and link descriptions exchanged with the engine.

use multinet_types::SwitchType;
use std::net::{Ipv4Addr, SocketAddr};

/// A remote controller known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControllerHandle {
    /// Engine-local node name.
    pub name: String,
    /// OpenFlow endpoint of the controller.
    pub address: SocketAddr,
}

/// Host to materialise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostSpec {
    /// Engine-local node name.
    pub name: String,
    /// Address assigned to the host's interface.
    pub ip: Ipv4Addr,
    /// Name of the switch the host hangs off.
    pub switch: String,
}

/// A host materialised by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostHandle {
    /// Engine-local node name.
    pub name: String,
    /// Address assigned to the host's interface.
    pub ip: Ipv4Addr,
}

/// Switch to materialise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwitchSpec {
    /// Engine-local node name.
    pub name: String,
    /// Datapath id, unique across all workers.
    pub dpid: u64,
    /// Soft switch implementation.
    pub kind: SwitchType,
}

impl SwitchSpec {
    /// Dpid in the 16-digit hexadecimal form used by OpenFlow tooling.
    pub fn dpid_hex(&self) -> String {
        format!("{:016x}", self.dpid)
    }
}

/// A switch materialised by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwitchHandle {
    /// Engine-local node name.
    pub name: String,
    /// Datapath id, unique across all workers.
    pub dpid: u64,
    /// Soft switch implementation.
    pub kind: SwitchType,
}

/// A link between two named nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkSpec {
    /// First endpoint.
    pub node1: String,
    /// Second endpoint.
    pub node2: String,
}

impl LinkSpec {
    /// Link between `node1` and `node2`.
    pub fn new(node1: impl Into<String>, node2: impl Into<String>) -> Self {
        Self {
            node1: node1.into(),
            node2: node2.into(),
        }
    }
}
