//! SQLite-backed snapshot store. One row per record name.

use argowatch_core::error::{ArgoWatchError, Result};
use argowatch_core::traits::SnapshotStore;
use argowatch_core::types::Snapshot;
use async_trait::async_trait;
use rusqlite::OptionalExtension;
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteStore {
    conn: Mutex<rusqlite::Connection>,
    record: String,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path, record: &str) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| ArgoWatchError::Store(format!("DB open {}: {e}", path.display())))?;
        Self::with_connection(conn, record)
    }

    /// In-memory database, for tests.
    pub fn open_in_memory(record: &str) -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| ArgoWatchError::Store(format!("DB open: {e}")))?;
        Self::with_connection(conn, record)
    }

    fn with_connection(conn: rusqlite::Connection, record: &str) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS snapshots (
                name TEXT PRIMARY KEY,
                state TEXT NOT NULL,        -- JSON object: app name -> status
                updated_at TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| ArgoWatchError::Store(format!("Migration: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            record: record.to_string(),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>> {
        self.conn
            .lock()
            .map_err(|_| ArgoWatchError::Store("sqlite connection poisoned".into()))
    }
}

#[async_trait]
impl SnapshotStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self) -> Result<Snapshot> {
        let state: Option<String> = self
            .conn()?
            .query_row(
                "SELECT state FROM snapshots WHERE name = ?1",
                rusqlite::params![self.record],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ArgoWatchError::Store(format!("Load '{}': {e}", self.record)))?;

        match state {
            None => Ok(Snapshot::new()),
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                ArgoWatchError::Store(format!("Corrupt snapshot '{}': {e}", self.record))
            }),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        self.conn()?
            .execute(
                "INSERT INTO snapshots (name, state, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE
                 SET state = excluded.state, updated_at = excluded.updated_at",
                rusqlite::params![self.record, json, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(|e| ArgoWatchError::Store(format!("Save '{}': {e}", self.record)))?;
        tracing::debug!("💾 Saved {} apps to sqlite record '{}'", snapshot.len(), self.record);
        Ok(())
    }
}
