//! # In-Memory Emulation Engine
//!
//! [`MemoryEngine`] implements [`EmulationEngine`](multinet_engine::EmulationEngine)
//! without creating any devices. It keeps the node and link graph in memory,
//! records recent calls as [`EngineEvent`]s in a bounded log, and answers
//! reachability tests by walking the graph of started switches.
//!
//! The engine is cheaply cloneable; clones share state, so a test can hand
//! one clone to a worker and inspect the other.

mod engine;

pub use engine::{
    DetectionPing, EngineEvent, MemoryEngine, MemoryEngineConfig, DEFAULT_EVENT_CAPACITY,
};
