//! Engine capability trait.

use crate::error::EngineError;
use crate::node::{ControllerHandle, HostHandle, HostSpec, LinkSpec, SwitchHandle, SwitchSpec};
use multinet_types::SwitchType;
use std::net::{IpAddr, SocketAddr};

/// Result of a reachability test between hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingReport {
    /// Pings sent.
    pub sent: u64,
    /// Pings answered.
    pub received: u64,
}

impl PingReport {
    /// Lost pings as a percentage of those sent. Zero pings count as no loss.
    pub fn packet_loss_percent(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        let lost = self.sent.saturating_sub(self.received);
        lost as f64 * 100.0 / self.sent as f64
    }
}

/// Capabilities the control plane needs from an emulation engine.
///
/// All calls are synchronous and expected to return promptly; pacing and
/// waiting are done by the caller. Node names are unique within one engine.
///
/// # Lifecycle
///
/// 1. `add_controller`, `add_host`, `add_switch`, `add_link` while building
/// 2. `start_controller`, then `start_switch` once per switch
/// 3. optional `batch_startup` per switch kind
/// 4. `interrupt_host` for every host, then `cleanup` to tear down
pub trait EmulationEngine: Send + 'static {
    /// Register a remote controller.
    fn add_controller(
        &mut self,
        name: &str,
        address: SocketAddr,
    ) -> Result<ControllerHandle, EngineError>;

    /// Start a previously added controller.
    fn start_controller(&mut self, controller: &ControllerHandle) -> Result<(), EngineError>;

    /// Materialise a host.
    fn add_host(&mut self, spec: &HostSpec) -> Result<HostHandle, EngineError>;

    /// Materialise a switch without starting it.
    fn add_switch(&mut self, spec: &SwitchSpec) -> Result<SwitchHandle, EngineError>;

    /// Connect two existing nodes.
    fn add_link(&mut self, spec: &LinkSpec) -> Result<(), EngineError>;

    /// Start one switch and attach it to the controller set.
    fn start_switch(
        &mut self,
        switch: &SwitchHandle,
        controllers: &[ControllerHandle],
    ) -> Result<(), EngineError>;

    /// Whether switches of this kind support one-shot batch activation.
    fn supports_batch_startup(&self, _kind: SwitchType) -> bool {
        false
    }

    /// Batch-activate every switch of one kind. Returns the switches that
    /// were activated successfully.
    fn batch_startup(
        &mut self,
        _kind: SwitchType,
        _switches: &[SwitchHandle],
    ) -> Result<Vec<SwitchHandle>, EngineError> {
        Ok(Vec::new())
    }

    /// Whether switches must report a controller connection before the
    /// topology counts as started.
    fn requires_connection_wait(&self) -> bool {
        false
    }

    /// Whether a started switch has connected to its controller.
    fn is_connected(&self, _switch: &SwitchHandle) -> bool {
        true
    }

    /// Make `host` send `count` pings towards `target` without waiting for
    /// them to complete.
    fn send_pings(&mut self, host: &HostHandle, target: IpAddr, count: u32)
        -> Result<(), EngineError>;

    /// Interrupt whatever command the host is running.
    fn interrupt_host(&mut self, host: &HostHandle) -> Result<(), EngineError>;

    /// Tear down every node and link the engine created.
    fn cleanup(&mut self) -> Result<(), EngineError>;

    /// All-pairs reachability between `hosts`.
    fn ping(&mut self, hosts: &[HostHandle]) -> Result<PingReport, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_loss() {
        assert_eq!(PingReport::default().packet_loss_percent(), 0.0);
        assert_eq!(
            PingReport {
                sent: 4,
                received: 4
            }
            .packet_loss_percent(),
            0.0
        );
        assert_eq!(
            PingReport {
                sent: 4,
                received: 1
            }
            .packet_loss_percent(),
            75.0
        );
        assert_eq!(
            PingReport {
                sent: 2,
                received: 0
            }
            .packet_loss_percent(),
            100.0
        );
    }
}
