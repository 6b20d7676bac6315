//! # Frame Decoder
//!
//! Decodes telemetry frames received from a node.

use bytes::Buf;

use super::protocol::*;
use crate::error::{MonitorError, Result};

/// Decode a 23-byte telemetry frame
///
/// The tag is the ASCII run before the first zero byte of the 11-byte tag
/// field. Values are read back bit-for-bit and never checked for
/// finiteness.
///
/// # Errors
///
/// Returns [`MonitorError::FrameLength`] if `frame` is not exactly
/// [`FRAME_SIZE`] bytes. No partial decode is attempted.
pub fn decode_frame(frame: &[u8]) -> Result<TelemetryFrame> {
    if frame.len() != FRAME_SIZE {
        return Err(MonitorError::FrameLength {
            expected: FRAME_SIZE,
            actual: frame.len(),
        });
    }

    let tag_field = &frame[..TAG_FIELD_SIZE];
    let tag_len = tag_field.iter().position(|&b| b == 0).unwrap_or(TAG_FIELD_SIZE);
    let tag = String::from_utf8_lossy(&tag_field[..tag_len]).into_owned();

    let mut values = &frame[HUMIDITY_OFFSET..];
    let humidity = values.get_f32_le();
    let temperature = values.get_f32_le();
    let pressure = values.get_f32_le();

    Ok(TelemetryFrame {
        tag,
        humidity,
        temperature,
        pressure,
    })
}
