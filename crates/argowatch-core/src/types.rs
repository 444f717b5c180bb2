//! Domain types: what Argo CD reports, what we remember, what changed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label used when Argo CD has not reported a status yet.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Sync + health labels of one application.
/// Both are opaque: the vocabulary belongs to Argo CD, not to us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStatus {
    pub sync_status: String,
    pub health_status: String,
}

impl AppStatus {
    pub fn new(sync_status: impl Into<String>, health_status: impl Into<String>) -> Self {
        Self {
            sync_status: sync_status.into(),
            health_status: health_status.into(),
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sync_status, self.health_status)
    }
}

/// One entry of a fetched inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    pub status: AppStatus,
}

impl Application {
    pub fn new(name: impl Into<String>, status: AppStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// Everything we have already told the user about: name → last notified status.
///
/// Serialized as a flat JSON object keyed by application name, which is
/// also the shape kept under `spec.state` of the Kubernetes record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, AppStatus>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a fetched inventory. Duplicate names: last one wins.
    pub fn from_inventory(apps: impl IntoIterator<Item = Application>) -> Self {
        Self(apps.into_iter().map(|a| (a.name, a.status)).collect())
    }

    pub fn get(&self, name: &str) -> Option<&AppStatus> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, status: AppStatus) -> Option<AppStatus> {
        self.0.insert(name.into(), status)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AppStatus)> {
        self.0.iter()
    }
}

impl FromIterator<(String, AppStatus)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, AppStatus)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A detected difference between two snapshots. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Added {
        name: String,
        status: AppStatus,
    },
    Changed {
        name: String,
        from: AppStatus,
        to: AppStatus,
    },
    Removed {
        name: String,
    },
}

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Self::Added { name, .. } | Self::Changed { name, .. } | Self::Removed { name } => name,
        }
    }

    /// Short kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Changed { .. } => "changed",
            Self::Removed { .. } => "removed",
        }
    }

    /// Human-readable chat message.
    pub fn message(&self) -> String {
        match self {
            Self::Added { name, status } => format!(
                "🔔 New application: {name}\nSync: {}\nHealth: {}",
                status.sync_status, status.health_status
            ),
            Self::Changed { name, from, to } => format!(
                "✏️ Application changed: {name}\nSync: {} → {}\nHealth: {} → {}",
                from.sync_status, to.sync_status, from.health_status, to.health_status
            ),
            Self::Removed { name } => format!("❌ Application removed from Argo CD: {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_inventory_last_one_wins() {
        let snap = Snapshot::from_inventory(vec![
            Application::new("web", AppStatus::new("Synced", "Healthy")),
            Application::new("web", AppStatus::new("OutOfSync", "Degraded")),
        ]);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("web"), Some(&AppStatus::new("OutOfSync", "Degraded")));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut snap = Snapshot::new();
        snap.insert("api", AppStatus::new("Synced", "Healthy"));
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["api"]["sync_status"], "Synced");
        assert_eq!(json["api"]["health_status"], "Healthy");

        let back: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn test_added_message() {
        let event = Event::Added {
            name: "billing".into(),
            status: AppStatus::new("Synced", "Healthy"),
        };
        let msg = event.message();
        assert!(msg.contains("billing"));
        assert!(msg.contains("Sync: Synced"));
        assert!(msg.contains("Health: Healthy"));
    }

    #[test]
    fn test_changed_message() {
        let event = Event::Changed {
            name: "billing".into(),
            from: AppStatus::new("Synced", "Healthy"),
            to: AppStatus::new("OutOfSync", "Healthy"),
        };
        let msg = event.message();
        assert!(msg.contains("billing"));
        assert!(msg.contains("Sync: Synced → OutOfSync"));
        assert!(msg.contains("Health: Healthy → Healthy"));
    }

    #[test]
    fn test_removed_message() {
        let event = Event::Removed {
            name: "legacy".into(),
        };
        assert_eq!(event.message(), "❌ Application removed from Argo CD: legacy");
        assert_eq!(event.kind(), "removed");
        assert_eq!(event.name(), "legacy");
    }
}
