//! # Telemetry Types
//!
//! Sample values, channel naming and row formatting shared by the node's
//! log and the consumer's output.

use chrono::{Datelike, NaiveDateTime};
use serde::Deserialize;

/// One humidity/temperature/pressure reading
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// Relative humidity in %RH
    pub humidity: f32,

    /// Temperature in °C
    pub temperature: f32,

    /// Pressure in hPa
    pub pressure: f32,
}

impl Sample {
    pub fn new(humidity: f32, temperature: f32, pressure: f32) -> Self {
        Self {
            humidity,
            temperature,
            pressure,
        }
    }

    /// Values in channel order, formatted for a log row
    ///
    /// Non-finite values render as `NaN` / `inf` / `-inf`.
    pub fn formatted(&self) -> [String; 3] {
        [
            format_value(self.humidity),
            format_value(self.temperature),
            format_value(self.pressure),
        ]
    }
}

/// Field delimiter of a log or record, fixed per deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Delimiter::Comma => ",",
            Delimiter::Tab => "\t",
        }
    }
}

/// Label of the timestamp column in log headers
pub const TIMESTAMP_LABEL: &str = "timestamp";

/// Channel labels qualified by device tag
///
/// # Examples
///
/// ```
/// use environment_monitor::telemetry::channel_labels;
///
/// assert_eq!(
///     channel_labels("lab_1"),
///     ["lab_1_humidity", "lab_1_temperature", "lab_1_pressure"],
/// );
/// ```
pub fn channel_labels(tag: &str) -> [String; 3] {
    [
        format!("{}_humidity", tag),
        format!("{}_temperature", tag),
        format!("{}_pressure", tag),
    ]
}

/// Render a value with two decimals, passing non-finite values through
pub fn format_value(value: f32) -> String {
    format!("{:.2}", value)
}

/// Human-readable row timestamp, e.g. `2021/8/4 9:05:07`
pub fn render_timestamp(at: &NaiveDateTime) -> String {
    at.format("%Y/%-m/%-d %-H:%M:%S").to_string()
}

/// Log file name for a calendar date: `DDMMYYYY.<extension>`
pub fn log_file_name(at: &NaiveDateTime, extension: &str) -> String {
    format!("{:02}{:02}{:04}.{}", at.day(), at.month(), at.year(), extension)
}
