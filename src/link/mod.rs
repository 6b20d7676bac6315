//! # Wireless Link Module
//!
//! Connection lifecycle of the node's BLE link and the traits the node
//! uses to talk to the radio.
//!
//! This module handles:
//! - The connected/disconnected state machine with re-advertisement
//! - The [`Advertiser`] and [`Link`] collaborator traits
//! - A serial radio bridge implementation ([`serial::SerialLink`])

pub mod serial;

use std::fmt;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::frame::protocol::FrameBytes;
use crate::identity::DeviceName;

/// Link-layer event reported by the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A consumer connected
    Connected,
    /// The consumer went away
    Disconnected,
}

/// Connection state of the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disconnected => f.write_str("disconnected"),
            LinkState::Connected => f.write_str("connected"),
        }
    }
}

/// Something that can (re)start advertising under a name
#[cfg_attr(test, mockall::automock)]
pub trait Advertiser {
    /// Advertise under `name`, replacing any previous advertisement
    fn advertise(&mut self, name: &DeviceName) -> Result<()>;
}

/// Full radio collaborator used by the telemetry cycle
pub trait Link: Advertiser {
    /// Drain pending connect/disconnect events
    fn poll_events(&mut self) -> Result<Vec<LinkEvent>>;

    /// Copy the next pending rename command into `buf`
    ///
    /// Returns the number of bytes written, 0 if nothing is pending.
    fn read_command(&mut self, buf: &mut [u8]) -> usize;

    /// Write a frame to the telemetry characteristic
    fn publish(&mut self, frame: &FrameBytes) -> Result<()>;
}

/// Connection state machine
///
/// Driven synchronously from the poll point of each cycle. Every real
/// transition restarts advertising so the node stays discoverable.
#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    state: LinkState,
}

impl ConnectionMonitor {
    /// New monitor in the `Disconnected` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state (read-only view for the status surface)
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Apply one link event
    ///
    /// Events that do not change the state are ignored. The state changes
    /// even if re-advertising fails; the advertise error is returned.
    pub fn handle_event(
        &mut self,
        event: LinkEvent,
        name: &DeviceName,
        advertiser: &mut dyn Advertiser,
    ) -> Result<()> {
        let next = match event {
            LinkEvent::Connected => LinkState::Connected,
            LinkEvent::Disconnected => LinkState::Disconnected,
        };

        if next == self.state {
            debug!("Ignoring {:?} while already {}", event, self.state);
            return Ok(());
        }

        info!("Link {} -> {}", self.state, next);
        self.state = next;

        advertiser.advertise(name).map_err(|e| {
            warn!("Re-advertising as '{}' failed: {}", name, e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;

    #[test]
    fn test_initial_state_disconnected() {
        assert_eq!(ConnectionMonitor::new().state(), LinkState::Disconnected);
    }

    #[test]
    fn test_connect_then_disconnect_advertises_twice() {
        let name = DeviceName::default();
        let mut adv = MockAdvertiser::new();
        adv.expect_advertise().times(2).returning(|_| Ok(()));

        let mut monitor = ConnectionMonitor::new();
        monitor.handle_event(LinkEvent::Connected, &name, &mut adv).unwrap();
        assert_eq!(monitor.state(), LinkState::Connected);
        monitor.handle_event(LinkEvent::Disconnected, &name, &mut adv).unwrap();
        assert_eq!(monitor.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_repeated_event_is_ignored() {
        let name = DeviceName::default();
        let mut adv = MockAdvertiser::new();
        adv.expect_advertise().times(1).returning(|_| Ok(()));

        let mut monitor = ConnectionMonitor::new();
        monitor.handle_event(LinkEvent::Disconnected, &name, &mut adv).unwrap();
        monitor.handle_event(LinkEvent::Connected, &name, &mut adv).unwrap();
        monitor.handle_event(LinkEvent::Connected, &name, &mut adv).unwrap();
        assert_eq!(monitor.state(), LinkState::Connected);
    }

    #[test]
    fn test_advertise_failure_still_transitions() {
        let name = DeviceName::default();
        let mut adv = MockAdvertiser::new();
        adv.expect_advertise()
            .returning(|_| Err(MonitorError::Link("no bridge".to_string())));

        let mut monitor = ConnectionMonitor::new();
        assert!(monitor.handle_event(LinkEvent::Connected, &name, &mut adv).is_err());
        assert_eq!(monitor.state(), LinkState::Connected);
    }

    #[test]
    fn test_link_state_display() {
        assert_eq!(LinkState::Connected.to_string(), "connected");
        assert_eq!(LinkState::Disconnected.to_string(), "disconnected");
    }
}
