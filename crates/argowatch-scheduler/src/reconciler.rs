//! Reconciler — fetch, diff, notify, commit.
//!
//! Owns the in-memory snapshot between cycles. The store is only the durable
//! copy: it is read once (first cycle) and written at the end of every
//! successful fetch+diff pass.

use argowatch_core::config::SaveFailurePolicy;
use argowatch_core::error::Result;
use argowatch_core::traits::{InventorySource, Notifier, SnapshotStore};
use argowatch_core::types::{Event, Snapshot};

/// Outcome of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
    /// Notifications accepted by the sink.
    pub delivered: usize,
    /// Notifications the sink rejected (logged, not retried).
    pub failed: usize,
    /// False only under `SaveFailurePolicy::Advance` when the save failed.
    pub persisted: bool,
}

impl CycleReport {
    pub fn events(&self) -> usize {
        self.added + self.changed + self.removed
    }
}

/// Classify every difference between `last` and `current`.
///
/// Added/Changed come first in name order, then Removed in name order.
/// Status equality is structural over sync + health.
pub fn diff(last: &Snapshot, current: &Snapshot) -> Vec<Event> {
    let mut events = Vec::new();

    for (name, status) in current.iter() {
        match last.get(name) {
            None => events.push(Event::Added {
                name: name.clone(),
                status: status.clone(),
            }),
            Some(previous) if previous != status => events.push(Event::Changed {
                name: name.clone(),
                from: previous.clone(),
                to: status.clone(),
            }),
            Some(_) => {}
        }
    }

    for (name, _) in last.iter() {
        if !current.contains(name) {
            events.push(Event::Removed { name: name.clone() });
        }
    }

    events
}

pub struct Reconciler {
    source: Box<dyn InventorySource>,
    notifier: Box<dyn Notifier>,
    store: Box<dyn SnapshotStore>,
    policy: SaveFailurePolicy,
    /// `None` until the store has been read.
    snapshot: Option<Snapshot>,
    /// In-memory snapshot is ahead of the store (Advance policy only).
    dirty: bool,
}

impl Reconciler {
    pub fn new(
        source: Box<dyn InventorySource>,
        notifier: Box<dyn Notifier>,
        store: Box<dyn SnapshotStore>,
        policy: SaveFailurePolicy,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            policy,
            snapshot: None,
            dirty: false,
        }
    }

    /// Last committed (or, under `Advance`, last notified) snapshot.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// One fetch–diff–notify–commit pass.
    ///
    /// A load or fetch error returns before anything is notified or saved.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        if self.snapshot.is_none() {
            let loaded = self.store.load().await?;
            tracing::info!(
                "📂 Loaded snapshot with {} apps from {} store",
                loaded.len(),
                self.store.name()
            );
            self.snapshot = Some(loaded);
        }

        let apps = self.source.fetch().await?;
        let current = Snapshot::from_inventory(apps);

        let last = self.snapshot.get_or_insert_with(Snapshot::new);
        let events = diff(last, &current);

        let mut report = CycleReport {
            persisted: true,
            ..Default::default()
        };

        for event in &events {
            match event {
                Event::Added { .. } => report.added += 1,
                Event::Changed { .. } => report.changed += 1,
                Event::Removed { .. } => report.removed += 1,
            }
            tracing::info!("🔔 {} {}", event.kind(), event.name());

            match self.notifier.deliver(&event.message()).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        "⚠️ {} notification for '{}' via {} failed: {e}",
                        event.kind(),
                        event.name(),
                        self.notifier.name()
                    );
                }
            }
        }

        if self.dirty {
            tracing::info!("💾 Retrying persistence of previously unsaved snapshot");
        }

        match self.store.save(&current).await {
            Ok(()) => {
                self.snapshot = Some(current);
                self.dirty = false;
            }
            Err(e) => match self.policy {
                SaveFailurePolicy::Rollback => {
                    tracing::warn!(
                        "⚠️ Snapshot save failed, keeping previous snapshot \
                         ({} events may repeat): {e}",
                        events.len()
                    );
                    return Err(e);
                }
                SaveFailurePolicy::Advance => {
                    tracing::warn!("⚠️ Snapshot save failed, will retry next cycle: {e}");
                    self.snapshot = Some(current);
                    self.dirty = true;
                    report.persisted = false;
                }
            },
        }

        Ok(report)
    }
}
