//! Whole-file JSON persistence for the reading log.
//!
//! The log lives in a single pretty-printed JSON file. Writers serialize
//! the full log on every append; that is deliberate, the file doubles as a
//! human-readable record and the rig produces a few readings per minute at
//! most.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::log::ReadingLog;
use crate::reading::SensorReading;

/// Log file used when no explicit path is configured.
pub const DEFAULT_DATA_FILE: &str = "sensor_data.json";

/// Errors from reading or writing the log file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read log file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write log file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("log file {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode reading log: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// The on-disk reading log.
///
/// A missing file reads as an empty log, so the store works from first
/// boot without any setup step. Appends serialize through an internal
/// lock; share the store behind an [`std::sync::Arc`] and concurrent
/// submissions cannot drop each other's readings.
#[derive(Debug)]
pub struct ReadingStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ReadingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ReadingStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the log file exists on disk yet.
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Read the full log from disk. A missing file is an empty log; a
    /// present but unparseable file is reported as [`StoreError::Corrupt`]
    /// rather than silently discarded.
    pub async fn load(&self) -> Result<ReadingLog, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Log file not found, starting empty");
                return Ok(ReadingLog::new());
            }
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Write the full log to disk, pretty-printed.
    pub async fn save(&self, log: &ReadingLog) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(log).map_err(StoreError::Serialize)?;

        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })
    }

    /// Append one reading to the log and persist it.
    ///
    /// Returns the number of readings in the log after the append. The
    /// load-append-save sequence runs under the store's write lock.
    #[instrument(skip(self, reading), fields(path = %self.path.display()))]
    pub async fn record(&self, reading: SensorReading) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut log = self.load().await?;
        log.push(reading);
        self.save(&log).await?;

        debug!(total = log.len(), "Reading appended to log");
        Ok(log.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_store(dir: &TempDir) -> ReadingStore {
        ReadingStore::new(dir.path().join("sensor_data.json"))
    }

    fn test_reading(label: &str) -> SensorReading {
        SensorReading::from_payload(
            &format!(r#"{{"temperature": 20.0, "label": "{label}"}}"#),
            "2024-06-01 12:00:00".to_string(),
        )
    }

    #[tokio::test]
    async fn test_missing_file_loads_as_empty_log() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        assert!(!store.exists().await);
        let log = store.load().await.unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_record_appends_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        assert_eq!(store.record(test_reading("a")).await.unwrap(), 1);
        assert_eq!(store.record(test_reading("b")).await.unwrap(), 2);

        let log = store.load().await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.select(0).unwrap(),
            &test_reading("a"),
        );
        assert_eq!(
            log.select(-1).unwrap(),
            &test_reading("b"),
        );
    }

    #[tokio::test]
    async fn test_log_file_is_pretty_printed_array() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        store.record(test_reading("a")).await.unwrap();

        let contents = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert!(contents.starts_with("[\n"));
        assert!(contents.contains("  {\n"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported_not_discarded() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        tokio::fs::write(store.path(), "not json at all")
            .await
            .unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));

        // A corrupt log also blocks appends; nothing is overwritten.
        let err = store.record(test_reading("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        let contents = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(contents, "not json at all");
    }

    #[tokio::test]
    async fn test_concurrent_records_keep_every_reading() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(create_test_store(&dir));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.record(test_reading(&format!("r{i}"))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let log = store.load().await.unwrap();
        assert_eq!(log.len(), 8);
    }
}
