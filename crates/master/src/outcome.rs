//! Per-worker results of a broadcast.

use multinet_types::WorkerDescriptor;
use std::fmt;
use std::time::Duration;

/// Prefix of the body text substituted for a worker that never answered.
///
/// Real worker bodies are JSON or empty, so they never start with it.
pub const FAILURE_MARKER: &str = "multinet-failure:";

/// Why no HTTP response came back from a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// No response within the allowed time.
    Timeout(Duration),
    /// The connection could not be established.
    Connect(String),
    /// The request or response body failed mid-flight.
    Transport(String),
    /// The dispatch task itself failed.
    TaskFailed(String),
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::Timeout(after) => write!(f, "timed out after {after:?}"),
            TransportFailure::Connect(e) => write!(f, "connection failed: {e}"),
            TransportFailure::Transport(e) => write!(f, "transport error: {e}"),
            TransportFailure::TaskFailed(e) => write!(f, "dispatch task failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The worker answered, with any status.
    Response { status: u16, body: String },
    Failure(TransportFailure),
}

/// What one worker returned for one broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub worker: WorkerDescriptor,
    pub outcome: Outcome,
}

impl WorkerOutcome {
    pub fn response(worker: WorkerDescriptor, status: u16, body: impl Into<String>) -> Self {
        Self {
            worker,
            outcome: Outcome::Response {
                status,
                body: body.into(),
            },
        }
    }

    pub fn failure(worker: WorkerDescriptor, failure: TransportFailure) -> Self {
        Self {
            worker,
            outcome: Outcome::Failure(failure),
        }
    }

    /// Whether the worker answered with a 2xx status.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Response { status, .. } if (200..300).contains(&status))
    }

    pub fn status(&self) -> Option<u16> {
        match self.outcome {
            Outcome::Response { status, .. } => Some(status),
            Outcome::Failure(_) => None,
        }
    }

    /// The worker's raw body, or a marker text naming the worker and the
    /// failure when there was no response.
    pub fn body_text(&self) -> String {
        match &self.outcome {
            Outcome::Response { body, .. } => body.clone(),
            Outcome::Failure(failure) => {
                format!("{FAILURE_MARKER} worker {} {failure}", self.worker)
            }
        }
    }
}
