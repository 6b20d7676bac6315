//! # Telemetry Node
//!
//! The producer's per-tick control loop.
//!
//! One cycle, in fixed order:
//! 1. Drain link events into the connection state machine
//! 2. Apply at most one pending rename command
//! 3. Acquire a sample (a sensor fault ends the cycle with an error)
//! 4. Encode a frame with the *current* name and publish it
//! 5. Render the status screen
//! 6. Append the sample to the day's log
//!
//! Renames are applied before encoding so the frame published in the same
//! cycle already carries the new tag. Publishing and logging are
//! independent: a failure of one never suppresses the other.

pub mod sensor;
pub mod status;

use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::encode_frame;
use crate::frame::protocol::FrameBytes;
use crate::identity::{DeviceName, IdentityPersistence, IdentityStore, NAME_CAPACITY};
use crate::link::{ConnectionMonitor, Link, LinkState};
use crate::telemetry::{Clock, LogOutcome, LogRotator};

use sensor::Sensor;
use status::{Notice, Screen, StatusSurface, StatusView};

/// What one cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Frame handed to the link
    pub frame: FrameBytes,

    /// New name, if a rename was accepted this cycle
    pub renamed: Option<DeviceName>,

    /// Whether the link accepted the frame
    pub published: bool,

    /// Result of the log append
    pub logged: LogOutcome,

    /// Link state after polling
    pub link: LinkState,
}

/// The producer node and all of its collaborators
pub struct TelemetryNode<S, L, P, D, C> {
    sensor: S,
    link: L,
    identity: IdentityStore<P>,
    connection: ConnectionMonitor,
    rotator: LogRotator,
    status: D,
    clock: C,
    screen: Screen,
    screen_cycle_ticks: u32,
    cycles: u64,
}

impl<S, L, P, D, C> TelemetryNode<S, L, P, D, C>
where
    S: Sensor,
    L: Link,
    P: IdentityPersistence,
    D: StatusSurface,
    C: Clock,
{
    /// Bring the node up
    ///
    /// Loads the persisted name (falling back to the default and reporting
    /// why) and starts advertising under it.
    pub fn boot(
        sensor: S,
        mut link: L,
        persistence: P,
        rotator: LogRotator,
        mut status: D,
        clock: C,
        screen_cycle_ticks: u32,
    ) -> Self {
        let (identity, warning) = IdentityStore::load(persistence);
        if let Some(e) = warning {
            status.notice(&Notice::IdentityFallback(e.to_string()));
        }

        if let Err(e) = link.advertise(identity.current()) {
            warn!("Initial advertising failed: {}", e);
            status.notice(&Notice::LinkError(e.to_string()));
        }

        Self {
            sensor,
            link,
            identity,
            connection: ConnectionMonitor::new(),
            rotator,
            status,
            clock,
            screen: Screen::default(),
            screen_cycle_ticks,
            cycles: 0,
        }
    }

    /// Current device name
    pub fn identity(&self) -> &DeviceName {
        self.identity.current()
    }

    /// Current link state
    pub fn link_state(&self) -> LinkState {
        self.connection.state()
    }

    /// Screen shown on the next render
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Completed cycles since boot
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn status(&self) -> &D {
        &self.status
    }

    /// Run one telemetry cycle
    ///
    /// # Errors
    ///
    /// Only a sensor fault is returned. It happens before a frame is built,
    /// so no corrupt frame is ever published. The caller must stop cycling
    /// and [`halt`](Self::halt).
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.poll_link();
        let renamed = self.apply_pending_rename();

        let sample = self.sensor.read()?;

        let frame = encode_frame(
            self.identity.current().as_str(),
            sample.humidity,
            sample.temperature,
            sample.pressure,
        );
        let published = match self.link.publish(&frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("Publish failed: {}", e);
                self.status.notice(&Notice::PublishFailed(e.to_string()));
                false
            }
        };

        self.status.render(&StatusView {
            screen: self.screen,
            identity: self.identity.current(),
            link: self.connection.state(),
            sample: &sample,
        });

        let logged = self.rotator.append(self.identity.current(), &self.clock.now(), &sample);
        if let LogOutcome::StorageUnavailable(msg) = &logged {
            self.status.notice(&Notice::StorageUnavailable(msg.clone()));
        }

        self.cycles += 1;
        if self.screen_cycle_ticks > 0 && self.cycles % u64::from(self.screen_cycle_ticks) == 0 {
            self.screen = self.screen.next();
        }

        debug!("Cycle {} done (published: {}, logged: {})", self.cycles, published, logged.is_written());
        Ok(CycleReport {
            frame,
            renamed,
            published,
            logged,
            link: self.connection.state(),
        })
    }

    /// Show a fatal fault; the caller stalls afterwards
    pub fn halt(&mut self, fault: &crate::error::MonitorError) {
        self.status.fault(&fault.to_string());
    }

    fn poll_link(&mut self) {
        let events = match self.link.poll_events() {
            Ok(events) => events,
            Err(e) => {
                warn!("Link poll failed: {}", e);
                self.status.notice(&Notice::LinkError(e.to_string()));
                return;
            }
        };

        for event in events {
            if let Err(e) = self
                .connection
                .handle_event(event, self.identity.current(), &mut self.link)
            {
                self.status.notice(&Notice::LinkError(e.to_string()));
            }
        }
    }

    fn apply_pending_rename(&mut self) -> Option<DeviceName> {
        let mut buf = [0u8; NAME_CAPACITY];
        let len = self.link.read_command(&mut buf);
        if len == 0 {
            return None;
        }

        let outcome = self.identity.request_rename(&buf[..len], &mut self.link)?;

        self.status.clear_rename_region();
        self.status.notice(&Notice::Renamed(outcome.name.clone()));
        if let Some(e) = outcome.advertise_error {
            self.status.notice(&Notice::LinkError(e.to_string()));
        }
        if let Some(e) = outcome.persist_error {
            self.status.notice(&Notice::PersistFailed(e.to_string()));
        }
        Some(outcome.name)
    }
}
