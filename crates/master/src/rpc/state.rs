//! Shared state for master RPC handlers.

use crate::broadcast::Broadcaster;

#[derive(Clone)]
pub struct MasterState {
    pub broadcaster: Broadcaster,
    /// Port used for worker entries that do not name one.
    pub default_port: u16,
}
