//! Validation errors.

use thiserror::Error;

/// Rejections raised while validating a topology request.
///
/// These are raised before any emulation resources are allocated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("group size must be greater than zero")]
    ZeroGroupSize,

    #[error("unknown switch type: {0:?} (expected \"ovsk\" or \"user\")")]
    UnknownSwitchType(String),

    #[error("unknown topology type: {0:?} (expected disconnected, linear, ring or mesh)")]
    UnknownTopology(String),

    #[error("invalid controller address: {0:?}")]
    InvalidControllerAddress(String),

    #[error("topology size {size} exceeds the per-worker dpid block of {stride}")]
    TopologyTooLarge { size: usize, stride: u64 },

    #[error("{hosts} hosts per switch exceeds the maximum of {max}")]
    TooManyHosts { hosts: usize, max: usize },

    #[error("dpid offset must be at least 1")]
    ZeroDpidOffset,

    #[error(
        "{size} switches from dpid {first} exceed the maximum dpid {max}; \
         at most {max_workers} workers of this size fit in the dpid space"
    )]
    DpidOutOfRange {
        first: u64,
        size: usize,
        max: u64,
        max_workers: usize,
    },
}

/// Rejections raised while parsing worker addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("empty worker address")]
    Empty,

    #[error("invalid port in worker address {0:?}")]
    InvalidPort(String),

    #[error("address range starting at {start} with {count} entries leaves the /24")]
    RangeOverflow { start: String, count: usize },
}
