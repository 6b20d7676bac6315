//! # Sensor Adapter
//!
//! Reads the combined humidity/temperature/pressure sensor through the
//! Linux IIO sysfs interface.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::telemetry::Sample;

/// Relative humidity in milli-percent
const HUMIDITY_ATTR: &str = "in_humidityrelative_input";

/// Temperature in milli-degrees Celsius
const TEMPERATURE_ATTR: &str = "in_temp_input";

/// Pressure in kPa
const PRESSURE_ATTR: &str = "in_pressure_input";

/// Source of one sample triple per cycle
#[cfg_attr(test, mockall::automock)]
pub trait Sensor {
    /// Acquire one sample
    ///
    /// # Errors
    ///
    /// Any error is a [`MonitorError::Sensor`] and is fatal for the boot
    /// session.
    fn read(&mut self) -> Result<Sample>;
}

/// Sensor exposed as an IIO device (e.g. `/sys/bus/iio/devices/iio:device0`)
#[derive(Debug, Clone)]
pub struct IioSensor {
    device: PathBuf,
}

impl IioSensor {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }

    fn read_attr(&self, attr: &str) -> Result<f64> {
        read_number(&self.device.join(attr))
    }
}

impl Sensor for IioSensor {
    fn read(&mut self) -> Result<Sample> {
        let humidity = self.read_attr(HUMIDITY_ATTR)? / 1000.0;
        let temperature = self.read_attr(TEMPERATURE_ATTR)? / 1000.0;
        let pressure = self.read_attr(PRESSURE_ATTR)? * 10.0;

        let sample = Sample::new(humidity as f32, temperature as f32, pressure as f32);
        debug!("Sensor sample: {:?}", sample);
        Ok(sample)
    }
}

fn read_number(path: &Path) -> Result<f64> {
    let raw = fs::read_to_string(path)
        .map_err(|e| MonitorError::Sensor(format!("Failed to read {}: {}", path.display(), e)))?;
    raw.trim()
        .parse()
        .map_err(|e| MonitorError::Sensor(format!("Bad value {:?} in {}: {}", raw.trim(), path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_device(humidity: &str, temp: &str, pressure: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(HUMIDITY_ATTR), humidity).unwrap();
        fs::write(dir.path().join(TEMPERATURE_ATTR), temp).unwrap();
        fs::write(dir.path().join(PRESSURE_ATTR), pressure).unwrap();
        dir
    }

    #[test]
    fn test_read_converts_units() {
        let dir = fake_device("45500\n", "21250\n", "101.325\n");
        let sample = IioSensor::new(dir.path()).read().unwrap();
        assert!((sample.humidity - 45.5).abs() < 1e-4);
        assert!((sample.temperature - 21.25).abs() < 1e-4);
        assert!((sample.pressure - 1013.25).abs() < 1e-3);
    }

    #[test]
    fn test_missing_device_is_sensor_fault() {
        let dir = TempDir::new().unwrap();
        let result = IioSensor::new(dir.path().join("iio:device9")).read();
        assert!(matches!(result, Err(MonitorError::Sensor(_))));
    }

    #[test]
    fn test_garbage_value_is_sensor_fault() {
        let dir = fake_device("n/a", "21250", "101.3");
        assert!(matches!(IioSensor::new(dir.path()).read(), Err(MonitorError::Sensor(_))));
    }
}
