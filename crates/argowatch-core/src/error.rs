//! ArgoWatch error types.

use thiserror::Error;

/// Every fallible operation in the workspace returns this error.
#[derive(Debug, Error)]
pub enum ArgoWatchError {
    /// Missing or invalid setting. Fatal at startup.
    #[error("Config error: {0}")]
    Config(String),

    /// Argo CD could not be reached (connect, TLS, timeout).
    #[error("Inventory request failed: {0}")]
    Inventory(String),

    /// Argo CD answered with a non-success status.
    #[error("Inventory returned HTTP {status}: {body}")]
    InventoryStatus { status: u16, body: String },

    /// Argo CD answered 2xx but the body was not the expected shape.
    #[error("Invalid inventory payload: {0}")]
    InventoryPayload(String),

    /// A notification could not be delivered.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// The snapshot store rejected a load or save.
    #[error("Snapshot store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArgoWatchError {
    /// True for every error raised while fetching the inventory.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            Self::Inventory(_) | Self::InventoryStatus { .. } | Self::InventoryPayload(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ArgoWatchError>;
