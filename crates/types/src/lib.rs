//! Core types for the Multinet control plane.
//!
//! This crate provides the foundational types shared by the master and the
//! workers:
//!
//! - **Identifiers**: datapath-id allocation across workers ([`dpid`])
//! - **Workers**: worker descriptors and address ranges ([`worker`])
//! - **Topology**: wire-level topology requests and their validated form
//! - **Commands**: the control verbs understood by every worker
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend on
//! any other workspace crates, making it the foundation layer.

mod command;
pub mod dpid;
mod error;
mod topology;
pub mod worker;

pub use command::Command;
pub use dpid::{allocate, allocate_ranges, max_workers, IdentifierRange, DPID_STRIDE};
pub use error::{AddressError, ConfigError};
pub use topology::{
    SwitchType, TopologyConfig, TopologyParams, TopologyRequest, TopologyShape, MAX_DPID,
    MAX_HOSTS_PER_SWITCH,
};
pub use worker::{ip_range, WorkerDescriptor, DEFAULT_WORKER_PORT};
