//! Engine errors.

use thiserror::Error;

/// Failures reported by an emulation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A node with this name already exists.
    #[error("node already exists: {0}")]
    DuplicateNode(String),

    /// The named node is not known to the engine.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// The engine failed to start a node.
    #[error("failed to start {node}: {reason}")]
    StartFailed {
        /// Node that failed to start.
        node: String,
        /// Engine-specific reason.
        reason: String,
    },

    /// Any other engine-specific failure.
    #[error("engine failure: {0}")]
    Other(String),
}
