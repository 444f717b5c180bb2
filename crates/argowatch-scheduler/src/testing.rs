//! In-test fakes for the three collaborator traits.
//! Each fake hands out a cloneable handle so tests can steer it between cycles.

use argowatch_core::error::{ArgoWatchError, Result};
use argowatch_core::traits::{InventorySource, Notifier, SnapshotStore};
use argowatch_core::types::{AppStatus, Application, Snapshot};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub fn app(name: &str, sync: &str, health: &str) -> Application {
    Application::new(name, AppStatus::new(sync, health))
}

pub fn snapshot(apps: &[Application]) -> Snapshot {
    Snapshot::from_inventory(apps.to_vec())
}

pub struct SourceState {
    /// `Err(msg)` makes `fetch` fail with `Inventory(msg)`.
    pub next: std::result::Result<Vec<Application>, String>,
    pub calls: Vec<Instant>,
}

impl Default for SourceState {
    fn default() -> Self {
        Self {
            next: Ok(Vec::new()),
            calls: Vec::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeSource(pub Arc<Mutex<SourceState>>);

impl FakeSource {
    pub fn set(&self, apps: Vec<Application>) {
        self.0.lock().unwrap().next = Ok(apps);
    }

    pub fn fail(&self, msg: &str) {
        self.0.lock().unwrap().next = Err(msg.to_string());
    }

    pub fn calls(&self) -> Vec<Instant> {
        self.0.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl InventorySource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch(&self) -> Result<Vec<Application>> {
        let mut state = self.0.lock().unwrap();
        state.calls.push(Instant::now());
        state.next.clone().map_err(ArgoWatchError::Inventory)
    }
}

#[derive(Default)]
pub struct NotifierState {
    pub sent: Vec<String>,
    pub attempts: usize,
    /// Deliveries whose text contains this fail.
    pub fail_on: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeNotifier(pub Arc<Mutex<NotifierState>>);

impl FakeNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.0.lock().unwrap().sent.clone()
    }

    pub fn attempts(&self) -> usize {
        self.0.lock().unwrap().attempts
    }

    pub fn fail_on(&self, needle: &str) {
        self.0.lock().unwrap().fail_on = Some(needle.to_string());
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    fn name(&self) -> &str {
        "fake"
    }

    async fn deliver(&self, message: &str) -> Result<()> {
        let mut state = self.0.lock().unwrap();
        state.attempts += 1;
        if state.fail_on.as_deref().is_some_and(|n| message.contains(n)) {
            return Err(ArgoWatchError::Delivery("chat unavailable".into()));
        }
        state.sent.push(message.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct StoreState {
    pub record: Option<Snapshot>,
    pub loads: usize,
    pub saves: usize,
    pub fail_load: bool,
    pub fail_save: bool,
}

#[derive(Clone, Default)]
pub struct FakeStore(pub Arc<Mutex<StoreState>>);

impl FakeStore {
    pub fn with_record(snapshot: Snapshot) -> Self {
        let store = Self::default();
        store.0.lock().unwrap().record = Some(snapshot);
        store
    }

    pub fn record(&self) -> Option<Snapshot> {
        self.0.lock().unwrap().record.clone()
    }

    pub fn loads(&self) -> usize {
        self.0.lock().unwrap().loads
    }

    pub fn saves(&self) -> usize {
        self.0.lock().unwrap().saves
    }

    pub fn fail_load(&self, fail: bool) {
        self.0.lock().unwrap().fail_load = fail;
    }

    pub fn fail_save(&self, fail: bool) {
        self.0.lock().unwrap().fail_save = fail;
    }
}

#[async_trait]
impl SnapshotStore for FakeStore {
    fn name(&self) -> &str {
        "fake"
    }

    async fn load(&self) -> Result<Snapshot> {
        let mut state = self.0.lock().unwrap();
        state.loads += 1;
        if state.fail_load {
            return Err(ArgoWatchError::Store("store unreachable".into()));
        }
        Ok(state.record.clone().unwrap_or_default())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut state = self.0.lock().unwrap();
        state.saves += 1;
        if state.fail_save {
            return Err(ArgoWatchError::Store("write rejected".into()));
        }
        state.record = Some(snapshot.clone());
        Ok(())
    }
}
