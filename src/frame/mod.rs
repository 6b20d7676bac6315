//! # Telemetry Frame Module
//!
//! Fixed-layout binary frame carried by the node's single BLE characteristic.
//!
//! This module handles:
//! - Frame layout constants (23 bytes: 11-byte tag + three little-endian `f32`)
//! - Encoding a device tag and sample triple into a frame
//! - Decoding a frame back into tag and values on the consumer side

pub mod protocol;
pub mod encoder;
pub mod decoder;

pub use decoder::decode_frame;
pub use encoder::encode_frame;
pub use protocol::{TelemetryFrame, FRAME_SIZE};
