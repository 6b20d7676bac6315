//! # Consumer Module
//!
//! The data-consumer side of the link: decodes frames received by a BLE
//! central and turns them into records whose header matches the node's
//! log header, so both outputs can be diffed.
//!
//! This module handles:
//! - Decoding notifications into [`ConsumerRecord`]s
//! - Two-line text records and JSON-lines export
//! - Optional per-tag day logging with the host's clock
//! - Scanning, connecting and subscribing over BLE ([`central`])

pub mod central;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::Result;
use crate::frame::{decode_frame, TelemetryFrame};
use crate::identity::DeviceName;
use crate::telemetry::{channel_labels, Delimiter, LogOutcome, LogRotator, Sample};

/// Output format of the central
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Label header line followed by a delimited value line
    #[default]
    Lines,
    /// One JSON object per notification
    Jsonl,
}

/// One decoded notification
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerRecord {
    pub frame: TelemetryFrame,
}

impl ConsumerRecord {
    /// Decode a characteristic value
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MonitorError::FrameLength`] for values that
    /// are not exactly 23 bytes.
    pub fn decode(value: &[u8]) -> Result<Self> {
        Ok(Self {
            frame: decode_frame(value)?,
        })
    }

    /// Channel labels derived from the tag
    pub fn labels(&self) -> [String; 3] {
        channel_labels(&self.frame.tag)
    }

    /// Values as a sample
    pub fn sample(&self) -> Sample {
        Sample::new(self.frame.humidity, self.frame.temperature, self.frame.pressure)
    }

    pub fn header_line(&self, delimiter: Delimiter) -> String {
        self.labels().join(delimiter.as_str())
    }

    pub fn value_line(&self, delimiter: Delimiter) -> String {
        self.sample().formatted().join(delimiter.as_str())
    }

    /// Header line then value line
    pub fn render(&self, delimiter: Delimiter) -> String {
        format!("{}\n{}", self.header_line(delimiter), self.value_line(delimiter))
    }

    /// JSON object keyed by channel label
    ///
    /// Non-finite values are written as strings (`"NaN"`, `"inf"`) since
    /// JSON numbers cannot carry them.
    pub fn to_json(&self) -> Value {
        let [h, t, p] = self.labels();
        json!({
            "tag": self.frame.tag,
            h: json_value(self.frame.humidity),
            t: json_value(self.frame.temperature),
            p: json_value(self.frame.pressure),
        })
    }
}

fn json_value(value: f32) -> Value {
    if value.is_finite() {
        json!(value)
    } else {
        json!(value.to_string())
    }
}

/// Stateful handler for a subscribed characteristic
#[derive(Debug)]
pub struct ConsumerSession {
    format: ExportFormat,
    delimiter: Delimiter,
    rotator: Option<LogRotator>,
}

impl ConsumerSession {
    pub fn new(format: ExportFormat, delimiter: Delimiter, rotator: Option<LogRotator>) -> Self {
        Self {
            format,
            delimiter,
            rotator,
        }
    }

    /// Handle one value-changed notification received at `at`
    ///
    /// Returns the text to emit. When a log directory is configured the
    /// values are also appended to `<dir>/<tag>/DDMMYYYY.<ext>`.
    pub fn handle_notification(&mut self, value: &[u8], at: &NaiveDateTime) -> Result<String> {
        let record = ConsumerRecord::decode(value)?;

        if let Some(rotator) = self.rotator.as_mut() {
            match DeviceName::truncated(&record.frame.tag) {
                Ok(tag) => {
                    if let LogOutcome::StorageUnavailable(msg) = rotator.append(&tag, at, &record.sample()) {
                        warn!("Export log skipped: {}", msg);
                    }
                }
                Err(e) => warn!("Not logging frame with unusable tag: {}", e),
            }
        }

        Ok(match self.format {
            ExportFormat::Lines => record.render(self.delimiter),
            ExportFormat::Jsonl => record.to_json().to_string(),
        })
    }
}
