//! Emulation engine interface.
//!
//! The emulation engine (virtual hosts, soft switches, links, namespaces) is
//! an external collaborator. This crate defines the small capability surface
//! the control plane needs from it, plus the planner that turns a validated
//! [`TopologyConfig`](multinet_types::TopologyConfig) into concrete node and
//! link sets.
//!
//! # Architecture
//!
//! The worker never subclasses or wraps the engine's own network object.
//! It holds an engine value and drives it through [`EmulationEngine`]:
//!
//! ```text
//! Bootstrap sequencer                      Engine (owns devices)
//!      │                                     │
//!      ├─► plan = TopologyPlan::build(cfg)   │
//!      ├─► add_controller / add_host ───────►│ materialise nodes
//!      ├─► add_switch / add_link ───────────►│
//!      ├─► start_switch (paced, in order) ──►│
//!      └─► cleanup ─────────────────────────►│ tear everything down
//! ```
//!
//! `multinet-engine-memory` provides an in-memory implementation used by
//! tests and dry-run workers.

#![warn(missing_docs)]

mod error;
mod node;
mod plan;
mod traits;

pub use error::EngineError;
pub use node::{ControllerHandle, HostHandle, HostSpec, LinkSpec, SwitchHandle, SwitchSpec};
pub use plan::TopologyPlan;
pub use traits::{EmulationEngine, PingReport};
