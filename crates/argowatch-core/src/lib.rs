//! # ArgoWatch Core
//!
//! Shared building blocks for the ArgoWatch workspace:
//! - `types`  — applications, snapshots and change events
//! - `traits` — the inventory / notifier / snapshot-store seams
//! - `config` — TOML + environment configuration
//! - `error`  — the error taxonomy every crate returns

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{ArgoWatchError, Result};
pub use traits::{InventorySource, Notifier, SnapshotStore};
pub use types::{AppStatus, Application, Event, Snapshot};
