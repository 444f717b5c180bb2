//! Seams between the reconciler and the outside world.
//! Each collaborator is a trait object so backends can be swapped by config.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Application, Snapshot};

/// Lists the applications currently known to the GitOps controller.
#[async_trait]
pub trait InventorySource: Send + Sync {
    fn name(&self) -> &str;

    /// One read of the full inventory. No retries.
    /// An empty `Vec` means "zero applications", never "fetch failed".
    async fn fetch(&self) -> Result<Vec<Application>>;
}

/// Delivers a single text message. One attempt, no retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, message: &str) -> Result<()>;
}

/// Durable home of the last committed snapshot. Single writer.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    fn name(&self) -> &str;

    /// Returns an empty snapshot when no record exists yet.
    async fn load(&self) -> Result<Snapshot>;

    /// Create-or-replace the whole record.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
