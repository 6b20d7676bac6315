//! # Status Surface
//!
//! The node's display collaborator. The real panel driver is out of scope;
//! [`TracingDisplay`] renders every view as a structured `status` event.

use tracing::{error, info, warn};

use crate::identity::DeviceName;
use crate::link::LinkState;
use crate::telemetry::Sample;

/// Screens the display can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Readings,
    Identity,
    Link,
}

impl Screen {
    /// Next screen in rotation order
    pub fn next(self) -> Self {
        match self {
            Screen::Readings => Screen::Identity,
            Screen::Identity => Screen::Link,
            Screen::Link => Screen::Readings,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Screen::Readings => 0,
            Screen::Identity => 1,
            Screen::Link => 2,
        }
    }
}

/// Everything one render needs
#[derive(Debug, Clone, Copy)]
pub struct StatusView<'a> {
    pub screen: Screen,
    pub identity: &'a DeviceName,
    pub link: LinkState,
    pub sample: &'a Sample,
}

/// Side-channel conditions reported to the operator
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Booted with the default name
    IdentityFallback(String),
    /// A rename was applied
    Renamed(DeviceName),
    /// A rename could not be written to storage
    PersistFailed(String),
    /// A log row was dropped
    StorageUnavailable(String),
    /// A frame could not be published
    PublishFailed(String),
    /// Radio bridge trouble (polling or advertising)
    LinkError(String),
}

/// Display collaborator
pub trait StatusSurface {
    /// Draw the current screen
    fn render(&mut self, view: &StatusView<'_>);

    /// Show a condition message
    fn notice(&mut self, notice: &Notice);

    /// Blank the region showing the last rename input
    fn clear_rename_region(&mut self);

    /// Show a fatal fault; the node stalls afterwards
    fn fault(&mut self, message: &str);
}

/// Status surface that renders through `tracing`
#[derive(Debug, Default)]
pub struct TracingDisplay {
    last_notice: Option<Notice>,
}

impl TracingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent notice shown
    pub fn last_notice(&self) -> Option<&Notice> {
        self.last_notice.as_ref()
    }
}

impl StatusSurface for TracingDisplay {
    fn render(&mut self, view: &StatusView<'_>) {
        match view.screen {
            Screen::Readings => info!(
                target: "status",
                screen = view.screen.index(),
                "{}: {:.2} %RH  {:.2} C  {:.2} hPa",
                view.identity,
                view.sample.humidity,
                view.sample.temperature,
                view.sample.pressure
            ),
            Screen::Identity => info!(target: "status", screen = view.screen.index(), "Name: {}", view.identity),
            Screen::Link => info!(target: "status", screen = view.screen.index(), "BLE: {}", view.link),
        }
    }

    fn notice(&mut self, notice: &Notice) {
        match notice {
            Notice::Renamed(name) => info!(target: "status", "Renamed to {}", name),
            Notice::IdentityFallback(msg) => warn!(target: "status", "Using default name: {}", msg),
            Notice::PersistFailed(msg) => warn!(target: "status", "Name not saved: {}", msg),
            Notice::StorageUnavailable(msg) => warn!(target: "status", "SD card: {}", msg),
            Notice::PublishFailed(msg) => warn!(target: "status", "Publish failed: {}", msg),
            Notice::LinkError(msg) => warn!(target: "status", "BLE: {}", msg),
        }
        self.last_notice = Some(notice.clone());
    }

    fn clear_rename_region(&mut self) {
        self.last_notice = None;
    }

    fn fault(&mut self, message: &str) {
        error!(target: "status", "FAULT: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_rotation_wraps() {
        let mut screen = Screen::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(screen.index());
            screen = screen.next();
        }
        assert_eq!(seen, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_tracing_display_remembers_notice() {
        let mut display = TracingDisplay::new();
        display.notice(&Notice::PublishFailed("x".to_string()));
        assert_eq!(display.last_notice(), Some(&Notice::PublishFailed("x".to_string())));
        display.clear_rename_region();
        assert!(display.last_notice().is_none());
    }
}
