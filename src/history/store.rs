// src/history/store.rs

//! JSON persistence for the history ledger

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::{HistoryEntry, HistoryLedger};
use crate::config::APP_DIR;

/// History file format version
pub const HISTORY_FORMAT_VERSION: u32 = 1;

/// History file name
pub const HISTORY_FILE: &str = "history.json";

/// Errors that can occur when loading or saving history
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse history file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported history file version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

#[derive(Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    entries: Vec<HistoryEntry>,
}

/// `<data_dir>/extconv/history.json`
pub fn default_history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR).join(HISTORY_FILE))
}

/// A history ledger stored as JSON on disk
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger; a missing file is an empty ledger
    pub fn load(&self) -> Result<HistoryLedger, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history file at {}", self.path.display());
                return Ok(HistoryLedger::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let file: HistoryFile =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        if file.version != HISTORY_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: file.version,
                expected: HISTORY_FORMAT_VERSION,
            });
        }

        debug!("Loaded {} history entries", file.entries.len());
        Ok(HistoryLedger::from_entries(file.entries))
    }

    /// Write the ledger, replacing the file atomically
    pub fn save(&self, ledger: &HistoryLedger) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let file = HistoryFile {
            version: HISTORY_FORMAT_VERSION,
            entries: ledger.clone().into_entries(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!("Saved {} history entries to {}", ledger.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::package::ContainerKind;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nested").join("history.json"));

        let mut ledger = HistoryLedger::new();
        ledger.record(HistoryEntry::success("a.crx", ContainerKind::Chrome, "a_converted.xpi", 2));
        ledger.record(HistoryEntry::failure(
            "b.txt",
            None,
            ErrorKind::UnsupportedFormat,
            "Invalid file format",
        ));
        store.save(&ledger).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.entries()[0].original_name(), "b.txt");
    }

    #[test]
    fn test_rejects_garbage_and_future_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = HistoryStore::new(&path);

        fs::write(&path, "not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Parse { .. })));

        fs::write(&path, r#"{"version": 9, "entries": []}"#).unwrap();
        assert!(matches!(
            store.load(),
            Err(StoreError::UnsupportedVersion { found: 9, .. })
        ));
    }
}
