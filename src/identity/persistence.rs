//! Persisted copy of the device name on removable storage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::DeviceName;
use crate::error::{MonitorError, Result};

/// Key-value persistence for the device name
#[cfg_attr(test, mockall::automock)]
pub trait IdentityPersistence {
    /// Read the stored name line, `Ok(None)` if nothing is stored
    fn load(&mut self) -> Result<Option<String>>;

    /// Replace the stored name in full
    fn store(&mut self, name: &DeviceName) -> Result<()>;
}

/// Name stored as a single ASCII line in a file on the storage root
#[derive(Debug, Clone)]
pub struct FileIdentityPersistence {
    root: PathBuf,
    file_name: String,
}

impl FileIdentityPersistence {
    /// Create a persistence handle for `<root>/<file_name>`
    pub fn new(root: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file_name: file_name.into(),
        }
    }

    /// Full path of the identity file
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.file_name)
    }

    fn check_storage(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(storage_missing(&self.root))
        }
    }
}

impl IdentityPersistence for FileIdentityPersistence {
    fn load(&mut self) -> Result<Option<String>> {
        self.check_storage()?;

        let contents = match fs::read_to_string(self.path()) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let line = contents.lines().next().unwrap_or("");
        debug!("Loaded identity line {:?} from {}", line, self.path().display());
        if line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(line.to_string()))
        }
    }

    fn store(&mut self, name: &DeviceName) -> Result<()> {
        self.check_storage()?;

        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        fs::write(&path, format!("{}\n", name))?;
        debug!("Stored identity '{}' to {}", name, path.display());
        Ok(())
    }
}

fn storage_missing(root: &Path) -> MonitorError {
    MonitorError::Storage(format!("storage not available at {}", root.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let mut p = FileIdentityPersistence::new(dir.path(), "CONFIG.TXT");
        assert_eq!(p.load().unwrap(), None);
    }

    #[test]
    fn test_load_missing_storage_is_error() {
        let dir = TempDir::new().unwrap();
        let mut p = FileIdentityPersistence::new(dir.path().join("unmounted"), "CONFIG.TXT");
        assert!(matches!(p.load(), Err(MonitorError::Storage(_))));
    }

    #[test]
    fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let mut p = FileIdentityPersistence::new(dir.path(), "CONFIG.TXT");
        p.store(&DeviceName::new("lab_1").unwrap()).unwrap();
        assert_eq!(p.load().unwrap().as_deref(), Some("lab_1"));
        assert_eq!(fs::read_to_string(p.path()).unwrap(), "lab_1\n");
    }

    #[test]
    fn test_store_overwrites_in_full() {
        let dir = TempDir::new().unwrap();
        let mut p = FileIdentityPersistence::new(dir.path(), "CONFIG.TXT");
        p.store(&DeviceName::new("longname").unwrap()).unwrap();
        p.store(&DeviceName::new("ab").unwrap()).unwrap();
        assert_eq!(fs::read_to_string(p.path()).unwrap(), "ab\n");
    }

    #[test]
    fn test_load_first_line_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("CONFIG.TXT"), "node7\r\nstale\n").unwrap();
        let mut p = FileIdentityPersistence::new(dir.path(), "CONFIG.TXT");
        assert_eq!(p.load().unwrap().as_deref(), Some("node7"));
    }

    #[test]
    fn test_load_empty_file_is_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("CONFIG.TXT"), "").unwrap();
        let mut p = FileIdentityPersistence::new(dir.path(), "CONFIG.TXT");
        assert_eq!(p.load().unwrap(), None);
    }

    #[test]
    fn test_store_without_storage_fails() {
        let dir = TempDir::new().unwrap();
        let mut p = FileIdentityPersistence::new(dir.path().join("gone"), "CONFIG.TXT");
        assert!(p.store(&DeviceName::default()).is_err());
    }
}
