//! # Frame Layout Constants and Types
//!
//! Wire layout of the telemetry frame:
//!
//! ```text
//! offset  0..11  tag          ASCII, left-justified, zero-padded
//! offset 11..15  humidity     f32 little-endian
//! offset 15..19  temperature  f32 little-endian
//! offset 19..23  pressure     f32 little-endian
//! ```

/// Width of the tag field in bytes
pub const TAG_FIELD_SIZE: usize = 11;

/// Usable characters of the tag field (the rest is always zero padding)
pub const TAG_MAX_CHARS: usize = 8;

/// Width of one IEEE-754 single precision value
pub const VALUE_SIZE: usize = 4;

/// Byte offset of the humidity value
pub const HUMIDITY_OFFSET: usize = TAG_FIELD_SIZE;

/// Byte offset of the temperature value
pub const TEMPERATURE_OFFSET: usize = HUMIDITY_OFFSET + VALUE_SIZE;

/// Byte offset of the pressure value
pub const PRESSURE_OFFSET: usize = TEMPERATURE_OFFSET + VALUE_SIZE;

/// Total frame size
pub const FRAME_SIZE: usize = PRESSURE_OFFSET + VALUE_SIZE;

const _: () = assert!(HUMIDITY_OFFSET == 11);
const _: () = assert!(TEMPERATURE_OFFSET == 15);
const _: () = assert!(PRESSURE_OFFSET == 19);
const _: () = assert!(FRAME_SIZE == 23);
const _: () = assert!(TAG_MAX_CHARS < TAG_FIELD_SIZE);

/// Raw frame bytes as published on the characteristic
pub type FrameBytes = [u8; FRAME_SIZE];

/// Decoded contents of a telemetry frame
///
/// Values are carried untouched: NaN and infinities are valid telemetry
/// and represent a faulty sensor read.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    /// Device tag (at most 8 ASCII characters)
    pub tag: String,

    /// Relative humidity in %RH
    pub humidity: f32,

    /// Temperature in °C
    pub temperature: f32,

    /// Pressure in hPa
    pub pressure: f32,
}

impl TelemetryFrame {
    /// Create a frame from a tag and sample triple
    pub fn new(tag: impl Into<String>, humidity: f32, temperature: f32, pressure: f32) -> Self {
        Self {
            tag: tag.into(),
            humidity,
            temperature,
            pressure,
        }
    }

    /// Compare two frames bit-for-bit (NaN payloads included)
    pub fn bitwise_eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.humidity.to_bits() == other.humidity.to_bits()
            && self.temperature.to_bits() == other.temperature.to_bits()
            && self.pressure.to_bits() == other.pressure.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_offsets() {
        assert_eq!(HUMIDITY_OFFSET, 11);
        assert_eq!(TEMPERATURE_OFFSET, 15);
        assert_eq!(PRESSURE_OFFSET, 19);
        assert_eq!(FRAME_SIZE, 23);
    }

    #[test]
    fn test_bitwise_eq_treats_nan_as_equal() {
        let a = TelemetryFrame::new("lab", f32::NAN, 1.0, 2.0);
        let b = a.clone();
        assert_ne!(a, b); // NaN != NaN under PartialEq
        assert!(a.bitwise_eq(&b));
    }
}
