//! Process-local store. Nothing survives a restart.

use argowatch_core::error::{ArgoWatchError, Result};
use argowatch_core::traits::SnapshotStore;
use argowatch_core::types::Snapshot;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing record.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            record: Mutex::new(Some(snapshot)),
        }
    }

    /// The stored record, if any save has happened.
    pub fn current(&self) -> Option<Snapshot> {
        self.record.lock().ok().and_then(|r| r.clone())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> Result<Snapshot> {
        let record = self
            .record
            .lock()
            .map_err(|_| ArgoWatchError::Store("memory store poisoned".into()))?;
        Ok(record.clone().unwrap_or_default())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut record = self
            .record
            .lock()
            .map_err(|_| ArgoWatchError::Store("memory store poisoned".into()))?;
        *record = Some(snapshot.clone());
        Ok(())
    }
}
