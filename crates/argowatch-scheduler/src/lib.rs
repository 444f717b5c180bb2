//! # ArgoWatch Scheduler
//!
//! The reconciliation loop.
//!
//! ## Architecture
//! ```text
//! Driver (tokio sleep, Running | Backoff)
//!   └── Reconciler::run_cycle
//!         ├── SnapshotStore::load     (first cycle only)
//!         ├── InventorySource::fetch  (error → abort, Backoff)
//!         ├── diff(last, current)     → Added / Changed / Removed
//!         ├── Notifier::deliver       (one attempt per event, failures isolated)
//!         └── SnapshotStore::save     (commit; failure handled per SaveFailurePolicy)
//! ```

pub mod backoff;
pub mod driver;
pub mod reconciler;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{Driver, DriverState};
pub use reconciler::{CycleReport, Reconciler, diff};
