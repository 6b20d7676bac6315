//! # Device Identity Module
//!
//! The node's single active name, used for advertising, as the log
//! directory and as the prefix of every channel label.
//!
//! This module handles:
//! - The bounded [`DeviceName`] type (at most 8 ASCII characters)
//! - Sanitizing inbound rename commands
//! - Persisting the name to removable storage
//! - The [`IdentityStore`] that keeps memory, advertising and storage in step

pub mod persistence;
pub mod store;

pub use persistence::{FileIdentityPersistence, IdentityPersistence};
pub use store::{IdentityStore, RenameOutcome};

use std::fmt;

use tracing::warn;

use crate::error::{MonitorError, Result};

/// Usable characters of a device name
pub const NAME_CAPACITY: usize = 8;

/// Sentinel name used when no persisted name is available
pub const DEFAULT_NAME: &str = "DEFAULT";

/// A validated device name
///
/// Always 1..=8 printable ASCII characters with no path separators, so it
/// is safe as a BLE local name, a directory component and a frame tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceName(String);

impl DeviceName {
    /// Validate and wrap a name
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidName`] if the name is empty, longer
    /// than 8 characters, or contains non-printable, non-ASCII or path
    /// separator characters.
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(MonitorError::InvalidName("name cannot be empty".to_string()));
        }

        if name.len() > NAME_CAPACITY {
            return Err(MonitorError::InvalidName(format!(
                "'{}' is longer than {} characters",
                name, NAME_CAPACITY
            )));
        }

        if let Some(bad) = name.chars().find(|c| !is_name_char(*c)) {
            return Err(MonitorError::InvalidName(format!(
                "'{}' contains invalid character {:?}",
                name, bad
            )));
        }

        Ok(Self(name.to_string()))
    }

    /// Validate a name, truncating it to 8 characters first
    pub fn truncated(name: &str) -> Result<Self> {
        if name.chars().count() > NAME_CAPACITY {
            let short: String = name.chars().take(NAME_CAPACITY).collect();
            warn!("Device name '{}' must be {} characters or less, using '{}'", name, NAME_CAPACITY, short);
            return Self::new(&short);
        }
        Self::new(name)
    }

    /// The name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DeviceName {
    fn default() -> Self {
        Self(DEFAULT_NAME.to_string())
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_graphic() && c != '/' && c != '\\'
}

/// Sanitize a raw rename command into a device name
///
/// Only the first 8 bytes are considered. A line feed (or carriage return
/// or NUL) truncates the name at that position; a space becomes an
/// underscore; every other byte passes through. Returns `None` when the
/// command is empty or whitespace-only, or sanitizes to an invalid name, in
/// which case the previous identity must be kept.
///
/// Control bytes, tabs, non-ASCII bytes and `/` or `\` are rejected rather
/// than passed through, since the name becomes a log directory component.
///
/// # Examples
///
/// ```
/// use environment_monitor::identity::sanitize_command;
///
/// assert_eq!(sanitize_command(b"lab 1\n").unwrap().as_str(), "lab_1");
/// assert!(sanitize_command(b"\n").is_none());
/// assert_eq!(sanitize_command(b"toolongname\n").unwrap().as_str(), "toolongn");
/// ```
pub fn sanitize_command(raw: &[u8]) -> Option<DeviceName> {
    let mut name = Vec::with_capacity(NAME_CAPACITY);
    let mut blank = true;

    for &byte in raw.iter().take(NAME_CAPACITY) {
        match byte {
            b'\n' | b'\r' | 0 => break,
            b' ' => name.push(b'_'),
            other => {
                blank &= other.is_ascii_whitespace();
                name.push(other);
            }
        }
    }

    if blank {
        return None;
    }

    let name = std::str::from_utf8(&name).ok()?;
    DeviceName::new(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name() {
        assert_eq!(DeviceName::default().as_str(), "DEFAULT");
    }

    #[test]
    fn test_new_rejects_invalid() {
        assert!(DeviceName::new("").is_err());
        assert!(DeviceName::new("123456789").is_err());
        assert!(DeviceName::new("a b").is_err());
        assert!(DeviceName::new("a/b").is_err());
        assert!(DeviceName::new("a\\b").is_err());
        assert!(DeviceName::new("née").is_err());
    }

    #[test]
    fn test_new_accepts_eight_chars() {
        assert_eq!(DeviceName::new("12345678").unwrap().to_string(), "12345678");
    }

    #[test]
    fn test_truncated() {
        assert_eq!(DeviceName::truncated("Arduino_Nano").unwrap().as_str(), "Arduino_");
        assert_eq!(DeviceName::truncated("short").unwrap().as_str(), "short");
    }

    #[test]
    fn test_sanitize_space_to_underscore() {
        assert_eq!(sanitize_command(b"lab 1\n").unwrap().as_str(), "lab_1");
    }

    #[test]
    fn test_sanitize_line_feed_only_is_noop() {
        assert!(sanitize_command(b"\n").is_none());
        assert!(sanitize_command(b"\r\n").is_none());
        assert!(sanitize_command(b"").is_none());
    }

    #[test]
    fn test_sanitize_whitespace_only_is_noop() {
        assert!(sanitize_command(b"  \n").is_none());
        assert!(sanitize_command(b" \t \r\n").is_none());
        assert!(sanitize_command(b"        abc").is_none());
        assert_eq!(sanitize_command(b" a\n").unwrap().as_str(), "_a");
    }

    #[test]
    fn test_sanitize_truncates_to_capacity() {
        assert_eq!(sanitize_command(b"toolongname\n").unwrap().as_str(), "toolongn");
    }

    #[test]
    fn test_sanitize_stops_at_line_feed() {
        assert_eq!(sanitize_command(b"ab\ncd").unwrap().as_str(), "ab");
    }

    #[test]
    fn test_sanitize_leading_zero_is_noop() {
        assert!(sanitize_command(&[0, b'a', b'b']).is_none());
    }

    #[test]
    fn test_sanitize_rejects_path_separator() {
        assert!(sanitize_command(b"../x\n").is_none());
    }

    #[test]
    fn test_sanitize_rejects_non_ascii() {
        assert!(sanitize_command(&[0xC3, 0xA9, b'\n']).is_none());
    }
}
