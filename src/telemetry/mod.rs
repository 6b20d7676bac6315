//! # Telemetry Module
//!
//! Handles per-day CSV logging of samples to removable storage.
//!
//! This module handles:
//! - The sample triple and its channel labels
//! - The calendar-time collaborator ([`clock::Clock`])
//! - Choosing the per-identity, per-day log file and writing its header once
//! - Surviving storage removal and re-insertion without a restart

pub mod clock;
pub mod logger;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use logger::{LogOutcome, LogRotator};
pub use types::{channel_labels, Delimiter, Sample};
