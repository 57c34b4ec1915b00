//! Topology requests and their validated form.
//!
//! The master forwards [`TopologyParams`] unmodified to every worker and
//! attaches a per-worker dpid offset, producing a [`TopologyRequest`]. Each
//! worker validates the request into a [`TopologyConfig`] before touching
//! the emulation engine.

use crate::dpid::{max_workers, DPID_STRIDE};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

/// Largest dpid a switch may carry.
///
/// Host addresses embed the dpid in the two middle octets of `10.x.y.z`.
pub const MAX_DPID: u64 = 0xFFFF;

/// Largest number of hosts that can hang off one switch.
///
/// Host addresses use the last octet for the host index (1..=254).
pub const MAX_HOSTS_PER_SWITCH: usize = 254;

/// Soft switch implementation used for the emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SwitchType {
    /// Kernel-datapath Open vSwitch.
    OvsKernel,
    /// User-space reference switch.
    User,
}

impl SwitchType {
    pub fn as_str(self) -> &'static str {
        match self {
            SwitchType::OvsKernel => "ovsk",
            SwitchType::User => "user",
        }
    }
}

impl FromStr for SwitchType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ovsk" => Ok(SwitchType::OvsKernel),
            "user" => Ok(SwitchType::User),
            other => Err(ConfigError::UnknownSwitchType(other.to_string())),
        }
    }
}

impl fmt::Display for SwitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the switch fabric built on each worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyShape {
    /// Switches with hosts and no inter-switch links.
    Disconnected,
    /// Switches chained one after another.
    Linear,
    /// A chain whose last switch links back to the first.
    Ring,
    /// Every switch linked to every other switch.
    Mesh,
}

impl TopologyShape {
    pub fn as_str(self) -> &'static str {
        match self {
            TopologyShape::Disconnected => "disconnected",
            TopologyShape::Linear => "linear",
            TopologyShape::Ring => "ring",
            TopologyShape::Mesh => "mesh",
        }
    }
}

impl FromStr for TopologyShape {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnected" => Ok(TopologyShape::Disconnected),
            "linear" => Ok(TopologyShape::Linear),
            "ring" => Ok(TopologyShape::Ring),
            "mesh" => Ok(TopologyShape::Mesh),
            other => Err(ConfigError::UnknownTopology(other.to_string())),
        }
    }
}

impl fmt::Display for TopologyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topology parameters shared by every worker of one broadcast.
///
/// Field names match the path parameters of the master's `init` route and
/// the JSON body of the worker's `init` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyParams {
    pub controller_ip_address: String,
    pub controller_of_port: u16,
    pub switch_type: String,
    pub topo_type: String,
    pub topo_size: usize,
    pub group_size: usize,
    /// Delay before each group, in milliseconds.
    pub group_delay: u64,
    pub hosts_per_switch: usize,
}

impl TopologyParams {
    /// Attach a worker's dpid offset.
    pub fn with_dpid_offset(&self, dpid_offset: u64) -> TopologyRequest {
        TopologyRequest {
            params: self.clone(),
            dpid_offset,
        }
    }
}

/// Body of a worker `init` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyRequest {
    #[serde(flatten)]
    pub params: TopologyParams,
    pub dpid_offset: u64,
}

/// A validated topology request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyConfig {
    /// OpenFlow endpoint of the remote controller.
    pub controller: SocketAddr,
    pub switch_type: SwitchType,
    pub shape: TopologyShape,
    /// Number of switches to build on this worker.
    pub size: usize,
    pub group_size: NonZeroUsize,
    pub group_delay: Duration,
    pub hosts_per_switch: usize,
    /// Dpid of the first switch on this worker.
    pub dpid_offset: u64,
}

impl TopologyConfig {
    /// Validate a request. Every rejection happens here, before any
    /// emulation resources exist.
    pub fn validate(request: &TopologyRequest) -> Result<Self, ConfigError> {
        let params = &request.params;

        let group_size = NonZeroUsize::new(params.group_size).ok_or(ConfigError::ZeroGroupSize)?;
        let switch_type = params.switch_type.parse::<SwitchType>()?;
        let shape = params.topo_type.parse::<TopologyShape>()?;

        let controller_ip = params
            .controller_ip_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidControllerAddress(params.controller_ip_address.clone()))?;

        if params.topo_size as u64 > DPID_STRIDE {
            return Err(ConfigError::TopologyTooLarge {
                size: params.topo_size,
                stride: DPID_STRIDE,
            });
        }

        if params.hosts_per_switch > MAX_HOSTS_PER_SWITCH {
            return Err(ConfigError::TooManyHosts {
                hosts: params.hosts_per_switch,
                max: MAX_HOSTS_PER_SWITCH,
            });
        }

        if request.dpid_offset == 0 {
            return Err(ConfigError::ZeroDpidOffset);
        }

        if params.topo_size > 0 {
            let first = request.dpid_offset;
            let fits = first
                .checked_add(params.topo_size as u64 - 1)
                .is_some_and(|last| last <= MAX_DPID);
            if !fits {
                return Err(ConfigError::DpidOutOfRange {
                    first,
                    size: params.topo_size,
                    max: MAX_DPID,
                    max_workers: max_workers(params.topo_size),
                });
            }
        }

        Ok(Self {
            controller: SocketAddr::new(controller_ip, params.controller_of_port),
            switch_type,
            shape,
            size: params.topo_size,
            group_size,
            group_delay: Duration::from_millis(params.group_delay),
            hosts_per_switch: params.hosts_per_switch,
            dpid_offset: request.dpid_offset,
        })
    }

    /// Number of pacing groups the rollout is split into.
    pub fn group_count(&self) -> usize {
        self.size.div_ceil(self.group_size.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TopologyParams {
        TopologyParams {
            controller_ip_address: "192.168.1.10".to_string(),
            controller_of_port: 6653,
            switch_type: "ovsk".to_string(),
            topo_type: "linear".to_string(),
            topo_size: 10,
            group_size: 3,
            group_delay: 100,
            hosts_per_switch: 2,
        }
    }

    #[test]
    fn test_validate_ok() {
        let config = TopologyConfig::validate(&params().with_dpid_offset(1001)).unwrap();
        assert_eq!(config.controller, "192.168.1.10:6653".parse().unwrap());
        assert_eq!(config.switch_type, SwitchType::OvsKernel);
        assert_eq!(config.shape, TopologyShape::Linear);
        assert_eq!(config.group_size.get(), 3);
        assert_eq!(config.group_delay, Duration::from_millis(100));
        assert_eq!(config.dpid_offset, 1001);
        assert_eq!(config.group_count(), 4);
    }

    #[test]
    fn test_zero_group_size_rejected() {
        let mut p = params();
        p.group_size = 0;
        assert_eq!(
            TopologyConfig::validate(&p.with_dpid_offset(1)),
            Err(ConfigError::ZeroGroupSize)
        );
    }

    #[test]
    fn test_unknown_tags_rejected() {
        let mut p = params();
        p.switch_type = "lagopus".to_string();
        assert!(matches!(
            TopologyConfig::validate(&p.with_dpid_offset(1)),
            Err(ConfigError::UnknownSwitchType(t)) if t == "lagopus"
        ));

        let mut p = params();
        p.topo_type = "torus".to_string();
        assert!(matches!(
            TopologyConfig::validate(&p.with_dpid_offset(1)),
            Err(ConfigError::UnknownTopology(t)) if t == "torus"
        ));
    }

    #[test]
    fn test_bad_controller_rejected() {
        let mut p = params();
        p.controller_ip_address = "controller.local".to_string();
        assert!(matches!(
            TopologyConfig::validate(&p.with_dpid_offset(1)),
            Err(ConfigError::InvalidControllerAddress(_))
        ));
    }

    #[test]
    fn test_size_limits() {
        let mut p = params();
        p.topo_size = 1001;
        assert!(matches!(
            TopologyConfig::validate(&p.with_dpid_offset(1)),
            Err(ConfigError::TopologyTooLarge { .. })
        ));

        let mut p = params();
        p.hosts_per_switch = 255;
        assert!(matches!(
            TopologyConfig::validate(&p.with_dpid_offset(1)),
            Err(ConfigError::TooManyHosts { .. })
        ));

        assert!(matches!(
            TopologyConfig::validate(&params().with_dpid_offset(65_530)),
            Err(ConfigError::DpidOutOfRange { .. })
        ));
        assert_eq!(
            TopologyConfig::validate(&params().with_dpid_offset(0)),
            Err(ConfigError::ZeroDpidOffset)
        );
    }

    #[test]
    fn test_huge_dpid_offset_rejected_without_overflow() {
        let mut p = params();
        p.topo_size = 2;
        assert_eq!(
            TopologyConfig::validate(&p.with_dpid_offset(u64::MAX)),
            Err(ConfigError::DpidOutOfRange {
                first: u64::MAX,
                size: 2,
                max: MAX_DPID,
                max_workers: 66,
            })
        );

        // Past the top of the range with a single switch.
        p.topo_size = 1;
        assert!(matches!(
            TopologyConfig::validate(&p.with_dpid_offset(MAX_DPID + 1)),
            Err(ConfigError::DpidOutOfRange { .. })
        ));
        assert!(TopologyConfig::validate(&p.with_dpid_offset(MAX_DPID)).is_ok());
    }

    #[test]
    fn test_dpid_error_names_worker_limit() {
        let mut p = params();
        p.topo_size = 1000;
        let err = TopologyConfig::validate(&p.with_dpid_offset(65_001)).unwrap_err();
        assert!(err.to_string().contains("at most 65 workers"), "{err}");
    }

    #[test]
    fn test_request_wire_format_is_flat() {
        let request = params().with_dpid_offset(2001);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["controller_ip_address"], "192.168.1.10");
        assert_eq!(json["topo_type"], "linear");
        assert_eq!(json["dpid_offset"], 2001);

        let parsed: TopologyRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, request);
    }
}
