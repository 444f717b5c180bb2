//! File-based snapshot store.
//! One pretty-printed JSON file per record — human-readable, easy to inspect.
//! Writes go to a temp file first and are renamed into place.

use argowatch_core::error::{ArgoWatchError, Result};
use argowatch_core::traits::SnapshotStore;
use argowatch_core::types::Snapshot;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store `record` as `<dir>/snapshot-<record>.json`.
    pub fn new(dir: &Path, record: &str) -> Result<Self> {
        if record.is_empty() || record.contains(['/', '\\']) || record.starts_with('.') {
            return Err(ArgoWatchError::Config(format!(
                "invalid snapshot record name for file store: '{record}'"
            )));
        }
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(format!("snapshot-{record}.json")),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> Result<Snapshot> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::new()),
            Err(e) => {
                return Err(ArgoWatchError::Store(format!(
                    "Read {}: {e}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_str(&json)
            .map_err(|e| ArgoWatchError::Store(format!("Parse {}: {e}", self.path.display())))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes())
            .await
            .map_err(|e| ArgoWatchError::Store(format!("Write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ArgoWatchError::Store(format!("Rename to {}: {e}", self.path.display())))?;
        tracing::debug!("💾 Saved {} apps to {}", snapshot.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argowatch_core::types::AppStatus;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = std::env::temp_dir().join("argowatch-test-file-empty");
        let store = FileStore::new(&dir, "prod").unwrap();
        tokio::fs::remove_file(store.path()).await.ok();
        assert!(store.load().await.unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_save_replaces_wholesale() {
        let dir = std::env::temp_dir().join("argowatch-test-file-save");
        let store = FileStore::new(&dir, "prod").unwrap();

        let mut first = Snapshot::new();
        first.insert("a", AppStatus::new("Synced", "Healthy"));
        first.insert("b", AppStatus::new("Synced", "Healthy"));
        store.save(&first).await.unwrap();

        let mut second = Snapshot::new();
        second.insert("a", AppStatus::new("OutOfSync", "Healthy"));
        store.save(&second).await.unwrap();

        assert_eq!(store.load().await.unwrap(), second);
        assert!(!store.path().with_extension("json.tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = std::env::temp_dir().join("argowatch-test-file-corrupt");
        let store = FileStore::new(&dir, "prod").unwrap();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load().await, Err(ArgoWatchError::Store(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_record_name_validation() {
        let dir = std::env::temp_dir().join("argowatch-test-file-names");
        assert!(FileStore::new(&dir, "../etc").is_err());
        assert!(FileStore::new(&dir, "a/b").is_err());
        assert!(FileStore::new(&dir, "").is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
