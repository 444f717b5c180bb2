//! # ArgoWatch Store
//!
//! Durable home of the last committed snapshot. Every backend addresses a
//! single named record and replaces it wholesale on save.
//!
//! | Backend      | Record                                             |
//! |--------------|----------------------------------------------------|
//! | `kubernetes` | custom object `spec.state` (in-cluster default)     |
//! | `file`       | `<dir>/snapshot-<record>.json`                      |
//! | `sqlite`     | row in `snapshots` keyed by record name             |
//! | `memory`     | process-local, lost on restart                      |

pub mod file;
pub mod kubernetes;
pub mod memory;
pub mod sqlite;

pub use file::FileStore;
pub use kubernetes::KubernetesStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use argowatch_core::config::{StoreBackend, StoreConfig};
use argowatch_core::error::Result;
use argowatch_core::traits::SnapshotStore;
use std::path::PathBuf;

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

/// Build the configured snapshot store.
pub fn store_from_config(config: &StoreConfig) -> Result<Box<dyn SnapshotStore>> {
    Ok(match config.backend {
        StoreBackend::Kubernetes => {
            Box::new(KubernetesStore::new(&config.kubernetes, &config.record)?)
        }
        StoreBackend::File => Box::new(FileStore::new(&expand_path(&config.dir), &config.record)?),
        StoreBackend::Sqlite => {
            Box::new(SqliteStore::open(&expand_path(&config.sqlite_path), &config.record)?)
        }
        StoreBackend::Memory => {
            tracing::warn!("⚠️ Using in-memory snapshot store: state is lost on restart");
            Box::new(MemoryStore::new())
        }
    })
}
