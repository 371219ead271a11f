//! Durable, atomically-written progress checkpoint.
//!
//! The checkpoint is a single JSON file holding every visited novel.
//! Saves go through a write-to-temp-then-rename sequence so a crash
//! mid-write leaves the previous complete snapshot readable: a loader
//! observes either the old state or the new state, never a torn mix.
//!
//! A missing file is a first run and loads as an empty snapshot. A file
//! that exists but does not parse is a fatal startup error; treating
//! corruption as "no progress" would silently re-crawl everything and
//! discard whatever the file used to say.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::FatalError;
use crate::models::ProgressSnapshot;

/// Owns the checkpoint file path and all reads/writes to it.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or an empty one when no checkpoint exists yet.
    #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<ProgressSnapshot, FatalError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No checkpoint found; starting fresh");
                return Ok(ProgressSnapshot::default());
            }
            Err(e) => {
                return Err(FatalError::Checkpoint {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        let snapshot: ProgressSnapshot =
            serde_json::from_slice(&raw).map_err(|e| FatalError::CorruptCheckpoint {
                path: self.path.clone(),
                source: e,
            })?;
        info!(sources = snapshot.len(), "Loaded checkpoint");
        Ok(snapshot)
    }

    /// Persist the snapshot atomically.
    pub async fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), FatalError> {
        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| FatalError::Checkpoint {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        })?;

        let tmp = self.tmp_path();
        fs::write(&tmp, &json).await.map_err(|e| FatalError::Checkpoint {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| FatalError::Checkpoint {
                path: self.path.clone(),
                source: e,
            })?;

        debug!(path = %self.path.display(), sources = snapshot.len(), "Checkpoint written");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.as_os_str().to_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChapterRecord, SourceEntry};
    use std::collections::BTreeMap;

    fn snapshot_with(source_id: &str) -> ProgressSnapshot {
        let mut found_terms = BTreeMap::new();
        found_terms.insert("dragon".to_string(), true);
        ProgressSnapshot {
            sources: vec![SourceEntry {
                source_id: source_id.to_string(),
                title: None,
                categories: vec![],
                tags: vec![],
                results: vec![ChapterRecord {
                    chapter_id: format!("{source_id}/chapter-1"),
                    found_terms,
                }],
            }],
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("results.json"));
        let snapshot = store.load().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("results.json"));
        let snapshot = snapshot_with("https://example.com/novel/a");

        store.save(&snapshot).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        tokio::fs::write(&path, b"[{\"source_id\": tru").await.unwrap();

        let store = ProgressStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, FatalError::CorruptCheckpoint { .. }));
    }

    #[tokio::test]
    async fn test_torn_write_leaves_previous_snapshot_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let store = ProgressStore::new(&path);

        let snapshot = snapshot_with("https://example.com/novel/a");
        store.save(&snapshot).await.unwrap();

        // A crash mid-save leaves a partial temp file behind; the
        // canonical path was never touched.
        let tmp = dir.path().join("results.json.tmp");
        tokio::fs::write(&tmp, b"[{\"source_id\"").await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("results.json"));

        let mut snapshot = snapshot_with("https://example.com/novel/a");
        store.save(&snapshot).await.unwrap();

        snapshot.append(SourceEntry {
            source_id: "https://example.com/novel/b".to_string(),
            title: None,
            categories: vec![],
            tags: vec![],
            results: vec![],
        });
        store.save(&snapshot).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
    }
}
