//! # Log Rotator
//!
//! Appends samples to `<root>/<identity>/DDMMYYYY.<ext>`. The first write
//! of a calendar date for an identity creates the file with a header row;
//! every later write that day appends one data row.
//!
//! The storage root is the removable medium's mount point. Availability is
//! checked right before each write, failures are returned as
//! [`LogOutcome::StorageUnavailable`] (never as an error), and the next
//! call re-initializes storage once so re-inserting the card heals logging
//! without a restart.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::types::{channel_labels, log_file_name, render_timestamp, Delimiter, Sample, TIMESTAMP_LABEL};
use crate::identity::DeviceName;

/// Default log file extension
pub const DEFAULT_EXTENSION: &str = "CSV";

/// What happened to one append
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutcome {
    /// New day file created with header and first row
    Created(PathBuf),

    /// Row appended to an existing day file
    Appended(PathBuf),

    /// Storage missing or unwritable; the row was dropped
    StorageUnavailable(String),
}

impl LogOutcome {
    pub fn is_written(&self) -> bool {
        !matches!(self, LogOutcome::StorageUnavailable(_))
    }
}

/// Per-identity, per-day CSV writer
#[derive(Debug)]
pub struct LogRotator {
    root: PathBuf,
    extension: String,
    delimiter: Delimiter,
    needs_reinit: bool,
}

impl LogRotator {
    /// Create a rotator writing under `root`
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>, delimiter: Delimiter) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            delimiter,
            needs_reinit: false,
        }
    }

    /// Path of the log file for `identity` on the date of `at`
    pub fn file_path(&self, identity: &DeviceName, at: &NaiveDateTime) -> PathBuf {
        self.root
            .join(identity.as_str())
            .join(log_file_name(at, &self.extension))
    }

    /// Append one sample row
    ///
    /// Never fails past this boundary; storage problems come back as
    /// [`LogOutcome::StorageUnavailable`].
    pub fn append(&mut self, identity: &DeviceName, at: &NaiveDateTime, sample: &Sample) -> LogOutcome {
        if self.needs_reinit {
            if let Err(e) = self.reinitialize() {
                warn!("Storage re-initialization failed: {}", e);
                return LogOutcome::StorageUnavailable(e.to_string());
            }
        }

        match self.write_row(identity, at, sample) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Log append failed for '{}': {}", identity, e);
                self.needs_reinit = true;
                LogOutcome::StorageUnavailable(e.to_string())
            }
        }
    }

    fn reinitialize(&mut self) -> io::Result<()> {
        check_storage(&self.root)?;
        self.needs_reinit = false;
        info!("Storage re-initialized at {}", self.root.display());
        Ok(())
    }

    fn write_row(&self, identity: &DeviceName, at: &NaiveDateTime, sample: &Sample) -> io::Result<LogOutcome> {
        check_storage(&self.root)?;

        let path = self.file_path(identity, at);
        let row = data_row(at, sample);

        // an empty day file never got its header
        if existing_len(&path)?.is_some_and(|len| len > 0) {
            let contents = self.render(&[row])?;
            OpenOptions::new().append(true).open(&path)?.write_all(&contents)?;
            debug!("Appended row to {}", path.display());
            return Ok(LogOutcome::Appended(path));
        }

        let dir = self.root.join(identity.as_str());
        match fs::create_dir(&dir) {
            Ok(()) => info!("Created log directory {}", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }

        let contents = self.render(&[header_row(identity), row])?;
        let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(&path)?;
        if let Err(e) = file.write_all(&contents).and_then(|()| file.sync_data()) {
            drop(file);
            if let Err(remove) = fs::remove_file(&path) {
                warn!("Could not remove partial log file {}: {}", path.display(), remove);
            }
            return Err(e);
        }
        info!("Started log file {}", path.display());
        Ok(LogOutcome::Created(path))
    }

    fn render(&self, records: &[Vec<String>]) -> io::Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter.as_byte())
            .has_headers(false)
            .from_writer(Vec::new());
        for record in records {
            writer.write_record(record).map_err(io::Error::from)?;
        }
        writer.into_inner().map_err(|e| e.into_error())
    }
}

fn existing_len(path: &Path) -> io::Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn check_storage(root: &Path) -> io::Result<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("storage not available at {}", root.display()),
        ))
    }
}

fn header_row(identity: &DeviceName) -> Vec<String> {
    let mut row = vec![TIMESTAMP_LABEL.to_string()];
    row.extend(channel_labels(identity.as_str()));
    row
}

fn data_row(at: &NaiveDateTime, sample: &Sample) -> Vec<String> {
    let mut row = vec![render_timestamp(at)];
    row.extend(sample.formatted());
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(d: u32, hh: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 8, d)
            .unwrap()
            .and_hms_opt(hh, 5, 7)
            .unwrap()
    }

    fn name(s: &str) -> DeviceName {
        DeviceName::new(s).unwrap()
    }

    fn lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_same_day_one_header_two_rows() {
        let dir = TempDir::new().unwrap();
        let mut rotator = LogRotator::new(dir.path(), "CSV", Delimiter::Comma);
        let sample = Sample::new(45.5, 21.25, 1013.0);

        let first = rotator.append(&name("lab_1"), &at(4, 9), &sample);
        let second = rotator.append(&name("lab_1"), &at(4, 10), &sample);

        let path = dir.path().join("lab_1").join("04082021.CSV");
        assert_eq!(first, LogOutcome::Created(path.clone()));
        assert_eq!(second, LogOutcome::Appended(path.clone()));
        assert_eq!(
            lines(&path),
            vec![
                "timestamp,lab_1_humidity,lab_1_temperature,lab_1_pressure",
                "2021/8/4 9:05:07,45.50,21.25,1013.00",
                "2021/8/4 10:05:07,45.50,21.25,1013.00",
            ]
        );
    }

    #[test]
    fn test_next_day_new_file_with_own_header() {
        let dir = TempDir::new().unwrap();
        let mut rotator = LogRotator::new(dir.path(), "CSV", Delimiter::Comma);
        let sample = Sample::default();

        rotator.append(&name("n"), &at(4, 23), &sample);
        let outcome = rotator.append(&name("n"), &at(5, 0), &sample);

        let next = dir.path().join("n").join("05082021.CSV");
        assert_eq!(outcome, LogOutcome::Created(next.clone()));
        assert_eq!(lines(&next).len(), 2);
        assert!(lines(&next)[0].starts_with("timestamp,"));
        assert_eq!(lines(&dir.path().join("n").join("04082021.CSV")).len(), 2);
    }

    #[test]
    fn test_existing_file_after_restart_is_appended() {
        let dir = TempDir::new().unwrap();
        let sample = Sample::default();
        LogRotator::new(dir.path(), "CSV", Delimiter::Comma).append(&name("n"), &at(4, 1), &sample);

        let mut rebooted = LogRotator::new(dir.path(), "CSV", Delimiter::Comma);
        let outcome = rebooted.append(&name("n"), &at(4, 2), &sample);
        assert!(matches!(outcome, LogOutcome::Appended(_)));
    }

    #[test]
    fn test_empty_day_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("n").join("04082021.CSV");
        fs::create_dir(dir.path().join("n")).unwrap();
        fs::write(&path, "").unwrap();

        let mut rotator = LogRotator::new(dir.path(), "CSV", Delimiter::Comma);
        let first = rotator.append(&name("n"), &at(4, 9), &Sample::default());
        let second = rotator.append(&name("n"), &at(4, 10), &Sample::default());

        assert_eq!(first, LogOutcome::Created(path.clone()));
        assert_eq!(second, LogOutcome::Appended(path.clone()));
        let rows = lines(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "timestamp,n_humidity,n_temperature,n_pressure");
        assert_eq!(rows.iter().filter(|r| r.starts_with("timestamp")).count(), 1);
    }

    #[test]
    fn test_tab_delimiter() {
        let dir = TempDir::new().unwrap();
        let mut rotator = LogRotator::new(dir.path(), "txt", Delimiter::Tab);
        rotator.append(&name("t"), &at(4, 9), &Sample::new(1.0, 2.0, 3.0));

        let rows = lines(&dir.path().join("t").join("04082021.txt"));
        assert_eq!(rows[0], "timestamp\tt_humidity\tt_temperature\tt_pressure");
        assert_eq!(rows[1], "2021/8/4 9:05:07\t1.00\t2.00\t3.00");
    }

    #[test]
    fn test_nan_logged_as_is() {
        let dir = TempDir::new().unwrap();
        let mut rotator = LogRotator::new(dir.path(), "CSV", Delimiter::Comma);
        rotator.append(&name("f"), &at(4, 9), &Sample::new(f32::NAN, f32::INFINITY, 0.0));

        let rows = lines(&dir.path().join("f").join("04082021.CSV"));
        assert_eq!(rows[1], "2021/8/4 9:05:07,NaN,inf,0.00");
    }

    #[test]
    fn test_storage_loss_and_recovery() {
        let dir = TempDir::new().unwrap();
        let card = dir.path().join("sd");
        let mut rotator = LogRotator::new(&card, "CSV", Delimiter::Comma);
        let sample = Sample::default();

        let missing = rotator.append(&name("n"), &at(4, 9), &sample);
        assert!(matches!(missing, LogOutcome::StorageUnavailable(_)));
        assert!(!missing.is_written());

        fs::create_dir(&card).unwrap();
        let healed = rotator.append(&name("n"), &at(4, 10), &sample);
        assert_eq!(healed, LogOutcome::Created(card.join("n").join("04082021.CSV")));
    }

    #[test]
    fn test_identities_get_separate_directories() {
        let dir = TempDir::new().unwrap();
        let mut rotator = LogRotator::new(dir.path(), "CSV", Delimiter::Comma);
        rotator.append(&name("a"), &at(4, 9), &Sample::default());
        rotator.append(&name("b"), &at(4, 9), &Sample::default());

        assert!(dir.path().join("a").join("04082021.CSV").exists());
        assert!(lines(&dir.path().join("b").join("04082021.CSV"))[0].contains("b_humidity"));
    }
}
