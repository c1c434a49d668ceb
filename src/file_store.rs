//! JSON-file [`RecordStore`] backend.
//!
//! The pantry record lives in one pretty-printed JSON file. Saves go to a
//! sibling temporary file which is flushed, synced, and then renamed over
//! the target, so a reader (or a crash) sees either the previous record or
//! the new one, never a truncated file. On Unix the containing directory is
//! synced after the rename so the new directory entry itself is durable.
//!
//! A file that fails to parse is logged and treated as absent.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use pantry_core::models::PantryRecord;
use pantry_core::store::RecordStore;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.store.path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pantry_state.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()))
    }

    /// Directory holding the record file; `.` for a bare file name.
    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// fsync a directory so a rename inside it survives power loss.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl RecordStore for FileStore {
    async fn load(&self) -> Result<PantryRecord> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no pantry record yet, starting empty");
                return Ok(PantryRecord::default());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read pantry record: {}", self.path.display())
                })
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "pantry record is unreadable, treating it as absent"
                );
                Ok(PantryRecord::default())
            }
        }
    }

    async fn save(&self, record: &PantryRecord) -> Result<()> {
        let dir = self.dir();
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.temp_path();

        let write = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&json).await?;
            file.flush().await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &self.path).await
        };

        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| {
                format!("Failed to write pantry record: {}", self.path.display())
            });
        }

        if let Err(e) = sync_dir(dir).await {
            warn!(dir = %dir.display(), error = %e, "failed to sync record directory");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("state.json"));
        assert_eq!(store.load().await.unwrap(), PantryRecord::default());
    }

    #[tokio::test]
    async fn test_save_creates_parent_and_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("nested/dir/state.json"));

        let mut record = PantryRecord::default();
        record.item_registry.resolve("Peanut Butter").unwrap();
        store.save(&record).await.unwrap();

        assert_eq!(store.load().await.unwrap(), record);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json["item_registry"]["peanut butter"].is_string());
        assert!(json["current_full_inventory"].is_array());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("state.json"));
        store.save(&PantryRecord::default()).await.unwrap();
        store.save(&PantryRecord::default()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_record_dir_for_bare_file_name() {
        assert_eq!(FileStore::new("state.json").dir(), Path::new("."));
        assert_eq!(
            FileStore::new("data/state.json").dir(),
            Path::new("data")
        );
    }

    #[tokio::test]
    async fn test_record_dir_is_syncable_after_save() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("data/state.json"));
        store.save(&PantryRecord::default()).await.unwrap();

        sync_dir(store.dir()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupted_file_treated_as_absent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "{ \"item_registry\": { ").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.load().await.unwrap(), PantryRecord::default());
    }
}
