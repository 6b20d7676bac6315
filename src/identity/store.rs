//! # Identity Store
//!
//! Owns the node's current name. Loads it once at boot and applies rename
//! commands, keeping the in-memory name, the advertised name and the
//! persisted copy converged.

use tracing::{info, warn};

use super::{sanitize_command, DeviceName, IdentityPersistence, NAME_CAPACITY};
use crate::error::MonitorError;
use crate::link::Advertiser;

/// Result of an accepted rename
#[derive(Debug)]
pub struct RenameOutcome {
    /// Name in effect before the rename
    pub previous: DeviceName,

    /// Name now in memory and being advertised
    pub name: DeviceName,

    /// Re-advertising failed (the name is still in effect locally)
    pub advertise_error: Option<MonitorError>,

    /// Persisting failed; memory and storage disagree until the next
    /// successful rename or a reboot with storage present
    pub persist_error: Option<MonitorError>,
}

/// Single owner of the device name
#[derive(Debug)]
pub struct IdentityStore<P> {
    current: DeviceName,
    persistence: P,
}

impl<P: IdentityPersistence> IdentityStore<P> {
    /// Load the persisted name, falling back to [`DeviceName::default`]
    ///
    /// Never fails. When storage is unavailable or holds nothing usable
    /// the sentinel name is used and the reason is returned alongside the
    /// store so the caller can surface it.
    pub fn load(mut persistence: P) -> (Self, Option<MonitorError>) {
        let (current, warning) = match persistence.load() {
            Ok(Some(line)) => match sanitize_command(line.as_bytes()) {
                Some(name) => (name, None),
                None => (
                    DeviceName::default(),
                    Some(MonitorError::InvalidName(format!("stored name {:?} is unusable", line))),
                ),
            },
            Ok(None) => (DeviceName::default(), None),
            Err(e) => (DeviceName::default(), Some(e)),
        };

        match &warning {
            Some(e) => warn!("Using default identity '{}': {}", current, e),
            None => info!("Device identity: '{}'", current),
        }

        (Self { current, persistence }, warning)
    }

    /// Current device name
    pub fn current(&self) -> &DeviceName {
        &self.current
    }

    /// Apply a raw rename command
    ///
    /// At most 8 bytes of `raw` are considered (see [`sanitize_command`]).
    /// Empty or unusable commands are ignored and return `None`. An
    /// accepted rename updates memory, re-advertises, then overwrites the
    /// persisted copy; failures of the last two steps are reported in the
    /// outcome but do not undo the rename.
    pub fn request_rename(
        &mut self,
        raw: &[u8],
        advertiser: &mut dyn Advertiser,
    ) -> Option<RenameOutcome> {
        let raw = &raw[..raw.len().min(NAME_CAPACITY)];
        let name = sanitize_command(raw)?;

        let previous = std::mem::replace(&mut self.current, name.clone());
        info!("Renaming device '{}' -> '{}'", previous, name);

        let advertise_error = advertiser.advertise(&name).err();
        if let Some(e) = &advertise_error {
            warn!("Failed to advertise new name '{}': {}", name, e);
        }

        let persist_error = self.persistence.store(&name).err();
        if let Some(e) = &persist_error {
            warn!("Failed to persist new name '{}': {}", name, e);
        }

        Some(RenameOutcome {
            previous,
            name,
            advertise_error,
            persist_error,
        })
    }
}
