//! Shared state for RPC handlers.

use crate::runner::WorkerHandle;
use std::time::Instant;

/// Shared state for RPC handlers.
#[derive(Clone)]
pub struct RpcState {
    /// Handle to the worker actor.
    pub worker: WorkerHandle,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl RpcState {
    pub fn new(worker: WorkerHandle) -> Self {
        Self {
            worker,
            start_time: Instant::now(),
        }
    }
}
