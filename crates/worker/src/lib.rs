//! # Multinet Worker
//!
//! A worker owns one slice of the distributed topology. It validates the
//! topology request it receives, has the emulation engine build the nodes
//! and links, and then starts switches in rate-limited groups so the remote
//! controller is not flooded with connections.
//!
//! # Architecture
//!
//! ```text
//! HTTP (axum) ──► WorkerHandle ──mpsc──► WorkerRunner ──► BootstrapSequencer ──► EmulationEngine
//!                     │                                          │
//!                     └────────── SharedStatus (booted, phase) ◄─┘
//! ```
//!
//! - [`sequencer`]: lifecycle state machine and the paced rollout
//! - [`inventory`]: what the engine has materialised for the current topology
//! - [`runner`]: the actor serialising lifecycle requests
//! - [`rpc`]: the worker HTTP API

pub mod inventory;
pub mod rpc;
pub mod runner;
pub mod sequencer;
pub mod status;

pub use inventory::TopologyInventory;
pub use runner::{WorkerError, WorkerHandle, WorkerRequest, WorkerRunner};
pub use sequencer::{BootstrapSequencer, SequencerConfig, SequencerError, DEFAULT_PING_COUNT};
pub use status::{Phase, SharedStatus};
