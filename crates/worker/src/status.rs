//! Worker lifecycle phase and the status shared with readers.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Lifecycle phase of a worker's topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No topology has been requested yet.
    Uninitialized,
    /// Nodes and links exist; no switch has been started.
    Built,
    /// The gradual rollout is in progress.
    Starting,
    /// Every switch has been started.
    Running,
    /// The topology was torn down; a fresh `init` is accepted.
    Stopped,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Built => "built",
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::Stopped => "stopped",
        }
    }

    /// Whether a new topology may be built from this phase.
    pub fn accepts_init(self) -> bool {
        matches!(self, Phase::Uninitialized | Phase::Stopped)
    }

    /// Whether there is a topology to tear down.
    pub fn accepts_stop(self) -> bool {
        matches!(self, Phase::Built | Phase::Starting | Phase::Running)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status published by the sequencer and read without going through the
/// worker actor.
///
/// The booted counter only changes inside the sequencer; readers see it
/// advance while a rollout is in flight.
#[derive(Debug, Clone)]
pub struct SharedStatus {
    booted: Arc<AtomicUsize>,
    phase: Arc<ArcSwap<Phase>>,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self {
            booted: Arc::new(AtomicUsize::new(0)),
            phase: Arc::new(ArcSwap::from_pointee(Phase::Uninitialized)),
        }
    }

    /// Switches started since the last `init`.
    pub fn booted(&self) -> usize {
        self.booted.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> Phase {
        **self.phase.load()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.store(Arc::new(phase));
    }

    /// Bump the booted counter, returning the new value.
    pub(crate) fn increment_booted(&self) -> usize {
        self.booted.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn reset_booted(&self) {
        self.booted.store(0, Ordering::Release);
    }
}

impl Default for SharedStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_observe_updates() {
        let status = SharedStatus::new();
        let reader = status.clone();
        assert_eq!(reader.phase(), Phase::Uninitialized);
        assert_eq!(reader.booted(), 0);

        status.set_phase(Phase::Starting);
        assert_eq!(status.increment_booted(), 1);
        assert_eq!(status.increment_booted(), 2);
        assert_eq!(reader.phase(), Phase::Starting);
        assert_eq!(reader.booted(), 2);

        status.reset_booted();
        assert_eq!(reader.booted(), 0);
    }

    #[test]
    fn test_phase_transitions_allowed() {
        assert!(Phase::Uninitialized.accepts_init());
        assert!(Phase::Stopped.accepts_init());
        assert!(!Phase::Running.accepts_init());
        assert!(Phase::Starting.accepts_stop());
        assert!(!Phase::Uninitialized.accepts_stop());
        assert!(!Phase::Stopped.accepts_stop());
    }

    #[test]
    fn test_phase_wire_format() {
        assert_eq!(serde_json::to_string(&Phase::Running).unwrap(), "\"running\"");
        assert_eq!(Phase::Built.to_string(), "built");
    }
}
