//! Resolves "which reading" and "which assets" for an embedding run.
//!
//! Everything here happens before any asset is modified: a bad index or
//! an unresolvable target aborts with nothing touched.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use vireo_readings::{ReadingStore, SelectError, SensorReading, StoreError};

/// Image container extension recognized during directory scans.
pub const ASSET_EXTENSION: &str = "dng";

/// Errors from resolving the reading or the asset set.
#[derive(Debug, Error)]
pub enum CorrelateError {
    #[error("sensor log {} not found", path.display())]
    NoLog { path: PathBuf },

    #[error("sensor log {} has no readings", path.display())]
    EmptyLog { path: PathBuf },

    #[error("{0}")]
    Select(#[from] SelectError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("target {} does not exist", path.display())]
    TargetNotFound { path: PathBuf },

    #[error("no .dng files found in {}", path.display())]
    NoAssets { path: PathBuf },

    #[error("failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A reading paired with the ordered assets it will be embedded into.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub reading: SensorReading,
    pub assets: Vec<PathBuf>,
}

/// Select one reading by signed index and resolve the target into an
/// ordered asset set.
pub async fn correlate(
    store: &ReadingStore,
    target: &Path,
    index: i64,
) -> Result<Correlation, CorrelateError> {
    if !store.exists().await {
        return Err(CorrelateError::NoLog {
            path: store.path().to_path_buf(),
        });
    }

    let log = store.load().await?;
    if log.is_empty() {
        return Err(CorrelateError::EmptyLog {
            path: store.path().to_path_buf(),
        });
    }

    let reading = log.select(index)?.clone();
    info!(
        index = index,
        entry = %serde_json::to_string(&reading).unwrap_or_default(),
        "Using sensor reading"
    );

    let assets = resolve_assets(target).await?;
    debug!(count = assets.len(), "Assets resolved");

    Ok(Correlation { reading, assets })
}

/// Resolve the target into the ordered asset set.
///
/// A file target is taken as-is, extension not required. A directory
/// yields every direct child named `*.dng` (case-insensitive), sorted by
/// name; subdirectories are not entered.
async fn resolve_assets(target: &Path) -> Result<Vec<PathBuf>, CorrelateError> {
    let metadata = match tokio::fs::metadata(target).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CorrelateError::TargetNotFound {
                path: target.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(CorrelateError::Scan {
                path: target.to_path_buf(),
                source: e,
            })
        }
    };

    if metadata.is_file() {
        return Ok(vec![target.to_path_buf()]);
    }

    if !metadata.is_dir() {
        return Err(CorrelateError::TargetNotFound {
            path: target.to_path_buf(),
        });
    }

    let mut entries = tokio::fs::read_dir(target)
        .await
        .map_err(|e| CorrelateError::Scan {
            path: target.to_path_buf(),
            source: e,
        })?;

    let mut assets = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CorrelateError::Scan {
            path: target.to_path_buf(),
            source: e,
        })?
    {
        let path = entry.path();
        if has_asset_extension(&path) {
            assets.push(path);
        }
    }

    if assets.is_empty() {
        return Err(CorrelateError::NoAssets {
            path: target.to_path_buf(),
        });
    }

    assets.sort();
    Ok(assets)
}

fn has_asset_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(ASSET_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vireo_readings::{ReadingLog, SensorField};

    fn create_test_store(dir: &TempDir) -> ReadingStore {
        ReadingStore::new(dir.path().join("sensor_data.json"))
    }

    async fn seed_readings(store: &ReadingStore, n: usize) {
        for i in 0..n {
            store
                .record(SensorReading::from_payload(
                    &format!(r#"{{"temperature": {i}}}"#),
                    format!("2024-06-01 12:00:0{i}"),
                ))
                .await
                .unwrap();
        }
    }

    async fn touch(path: &Path) {
        tokio::fs::write(path, b"").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_log_aborts() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        let err = correlate(&store, dir.path(), -1).await.unwrap_err();
        assert!(matches!(err, CorrelateError::NoLog { .. }));
    }

    #[tokio::test]
    async fn test_empty_log_aborts() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        store.save(&ReadingLog::new()).await.unwrap();

        let err = correlate(&store, dir.path(), -1).await.unwrap_err();
        assert!(matches!(err, CorrelateError::EmptyLog { .. }));
    }

    #[tokio::test]
    async fn test_out_of_range_index_aborts_before_asset_work() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        seed_readings(&store, 3).await;

        // The target does not exist; an index error must win, proving
        // selection happens before any asset resolution.
        let missing_target = dir.path().join("no-such-dir");
        let err = correlate(&store, &missing_target, 5).await.unwrap_err();

        assert!(matches!(err, CorrelateError::Select(_)));
        assert!(err.to_string().contains("0-2"));
    }

    #[tokio::test]
    async fn test_default_index_selects_latest_reading() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        seed_readings(&store, 3).await;

        let target = dir.path().join("photo.dng");
        touch(&target).await;

        let correlation = correlate(&store, &target, -1).await.unwrap();
        assert_eq!(
            correlation.reading.field(SensorField::Temperature),
            Some(&serde_json::json!(2))
        );
        assert_eq!(correlation.assets, vec![target]);
    }

    #[tokio::test]
    async fn test_file_target_needs_no_extension() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        seed_readings(&store, 1).await;

        let target = dir.path().join("frame.tiff");
        touch(&target).await;

        let correlation = correlate(&store, &target, 0).await.unwrap();
        assert_eq!(correlation.assets, vec![target]);
    }

    #[tokio::test]
    async fn test_directory_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        seed_readings(&store, 1).await;

        let shoot = dir.path().join("shoot");
        tokio::fs::create_dir(&shoot).await.unwrap();
        touch(&shoot.join("b.dng")).await;
        touch(&shoot.join("A.DNG")).await;
        touch(&shoot.join("notes.txt")).await;

        let correlation = correlate(&store, &shoot, 0).await.unwrap();
        assert_eq!(
            correlation.assets,
            vec![shoot.join("A.DNG"), shoot.join("b.dng")]
        );
    }

    #[tokio::test]
    async fn test_no_recursion_into_subdirectories() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        seed_readings(&store, 1).await;

        let shoot = dir.path().join("shoot");
        let nested = shoot.join("nested");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        touch(&shoot.join("top.dng")).await;
        touch(&nested.join("deep.dng")).await;

        let correlation = correlate(&store, &shoot, 0).await.unwrap();
        assert_eq!(correlation.assets, vec![shoot.join("top.dng")]);
    }

    #[tokio::test]
    async fn test_directory_without_assets_aborts() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        seed_readings(&store, 1).await;

        let shoot = dir.path().join("shoot");
        tokio::fs::create_dir(&shoot).await.unwrap();
        touch(&shoot.join("notes.txt")).await;

        let err = correlate(&store, &shoot, 0).await.unwrap_err();
        assert!(matches!(err, CorrelateError::NoAssets { .. }));
    }

    #[tokio::test]
    async fn test_missing_target_aborts() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        seed_readings(&store, 1).await;

        let err = correlate(&store, &dir.path().join("nowhere"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CorrelateError::TargetNotFound { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_log_propagates() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        tokio::fs::write(store.path(), "not json").await.unwrap();

        let err = correlate(&store, dir.path(), -1).await.unwrap_err();
        assert!(matches!(err, CorrelateError::Store(_)));
    }
}
