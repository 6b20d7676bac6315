//! # Error Types
//!
//! Custom error types for the environment monitor using `thiserror`.

use thiserror::Error;

/// Main error type for the environment monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Telemetry frame was not exactly the expected length
    #[error("Frame length error: expected {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sensor acquisition failed (fatal for the boot session)
    #[error("Sensor fault: {0}")]
    Sensor(String),

    /// Removable storage missing, full or unwritable
    #[error("Storage error: {0}")]
    Storage(String),

    /// Radio bridge / serial link errors
    #[error("Link error: {0}")]
    Link(String),

    /// Device name rejected
    #[error("Invalid device name: {0}")]
    InvalidName(String),

    /// BLE central errors
    #[error("BLE error: {0}")]
    Ble(String),
}

/// Result type alias for the environment monitor
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_length_message() {
        let err = MonitorError::FrameLength { expected: 23, actual: 22 };
        assert_eq!(err.to_string(), "Frame length error: expected 23 bytes, got 22");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MonitorError = io.into();
        assert!(matches!(err, MonitorError::Io(_)));
    }
}
