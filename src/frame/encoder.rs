//! # Frame Encoder
//!
//! Packs a device tag and sample triple into the fixed 23-byte frame.

use bytes::{BufMut, BytesMut};

use super::protocol::*;

/// Encode a tag and sample triple into a telemetry frame
///
/// The tag is written left-justified and zero-filled up to the 11-byte
/// field; at most 8 bytes of it are ever written. The three values follow
/// at offsets 11, 15 and 19 in little-endian order. Encoding is total:
/// NaN and infinities are copied bit-for-bit.
///
/// # Examples
///
/// ```
/// use environment_monitor::frame::encode_frame;
///
/// let frame = encode_frame("lab_1", 45.5, 21.25, 1013.0);
/// assert_eq!(frame.len(), 23);
/// assert_eq!(&frame[..5], b"lab_1");
/// assert_eq!(frame[5..11], [0u8; 6]);
/// ```
pub fn encode_frame(tag: &str, humidity: f32, temperature: f32, pressure: f32) -> FrameBytes {
    let tag_bytes = tag.as_bytes();
    let tag_bytes = &tag_bytes[..tag_bytes.len().min(TAG_MAX_CHARS)];

    let mut buf = BytesMut::with_capacity(FRAME_SIZE);
    buf.put_slice(tag_bytes);
    buf.put_bytes(0, TAG_FIELD_SIZE - tag_bytes.len());
    buf.put_f32_le(humidity);
    buf.put_f32_le(temperature);
    buf.put_f32_le(pressure);

    let mut frame = [0u8; FRAME_SIZE];
    frame.copy_from_slice(&buf);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_length() {
        assert_eq!(encode_frame("", 0.0, 0.0, 0.0).len(), FRAME_SIZE);
        assert_eq!(encode_frame("DEFAULT", 1.0, 2.0, 3.0).len(), FRAME_SIZE);
    }

    #[test]
    fn test_encode_tag_zero_padded() {
        let frame = encode_frame("abc", 0.0, 0.0, 0.0);
        assert_eq!(&frame[..3], b"abc");
        assert!(frame[3..TAG_FIELD_SIZE].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_full_width_tag() {
        let frame = encode_frame("12345678", 0.0, 0.0, 0.0);
        assert_eq!(&frame[..8], b"12345678");
        assert_eq!(frame[8..TAG_FIELD_SIZE], [0, 0, 0]);
    }

    #[test]
    fn test_encode_never_writes_past_eight_chars() {
        let frame = encode_frame("toolongname", 0.0, 0.0, 0.0);
        assert_eq!(&frame[..8], b"toolongn");
        assert_eq!(frame[8..TAG_FIELD_SIZE], [0, 0, 0]);
    }

    #[test]
    fn test_encode_values_little_endian() {
        let frame = encode_frame("n", 1.0, -2.5, 1013.25);
        assert_eq!(frame[HUMIDITY_OFFSET..TEMPERATURE_OFFSET], 1.0f32.to_le_bytes());
        assert_eq!(frame[TEMPERATURE_OFFSET..PRESSURE_OFFSET], (-2.5f32).to_le_bytes());
        assert_eq!(frame[PRESSURE_OFFSET..FRAME_SIZE], 1013.25f32.to_le_bytes());
    }

    #[test]
    fn test_encode_passes_nan_and_inf_through() {
        let nan = f32::from_bits(0x7FC0_1234);
        let frame = encode_frame("bad", nan, f32::INFINITY, f32::NEG_INFINITY);
        assert_eq!(frame[HUMIDITY_OFFSET..TEMPERATURE_OFFSET], 0x7FC0_1234u32.to_le_bytes());
        assert_eq!(frame[TEMPERATURE_OFFSET..PRESSURE_OFFSET], f32::INFINITY.to_le_bytes());
        assert_eq!(frame[PRESSURE_OFFSET..FRAME_SIZE], f32::NEG_INFINITY.to_le_bytes());
    }
}
