//! Argo CD REST client — one bearer-authenticated list call per cycle.

use argowatch_core::config::ArgoCdConfig;
use argowatch_core::error::{ArgoWatchError, Result};
use argowatch_core::traits::InventorySource;
use argowatch_core::types::{AppStatus, Application, UNKNOWN_STATUS};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Error bodies are cut to this many chars before they reach the logs.
const MAX_ERROR_BODY: usize = 512;

/// Inventory source backed by the Argo CD API server.
pub struct ArgoCdClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    projects: Vec<String>,
    selector: Option<String>,
}

impl ArgoCdClient {
    pub fn new(config: &ArgoCdConfig) -> Result<Self> {
        if !config.verify_tls {
            tracing::warn!(
                "⚠️ TLS verification for {} is DISABLED (argocd.verify_tls = false)",
                config.server
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ArgoWatchError::Config(format!("Failed to build Argo CD client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.server.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            projects: config.projects.clone(),
            selector: config.selector.clone().filter(|s| !s.is_empty()),
        })
    }

    fn applications_url(&self) -> String {
        format!("{}/api/v1/applications", self.base_url)
    }

    fn query(&self) -> Vec<(&str, &str)> {
        let mut query: Vec<(&str, &str)> = self
            .projects
            .iter()
            .map(|p| ("projects", p.as_str()))
            .collect();
        if let Some(selector) = &self.selector {
            query.push(("selector", selector.as_str()));
        }
        query
    }
}

#[async_trait]
impl InventorySource for ArgoCdClient {
    fn name(&self) -> &str {
        "argocd"
    }

    async fn fetch(&self) -> Result<Vec<Application>> {
        let mut request = self
            .client
            .get(self.applications_url())
            .bearer_auth(&self.token);
        let query = self.query();
        if !query.is_empty() {
            request = request.query(&query);
        }

        let response = request.send().await.map_err(|e| {
            ArgoWatchError::Inventory(format!("GET {}: {e}", self.applications_url()))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ArgoWatchError::Inventory(format!("Reading response body: {e}")))?;

        if !status.is_success() {
            return Err(ArgoWatchError::InventoryStatus {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let apps = parse_applications(&body)?;
        tracing::debug!("📥 Fetched {} applications from Argo CD", apps.len());
        Ok(apps)
    }
}

// --- Argo CD API Types (only the fields we read) ---

#[derive(Debug, Deserialize)]
struct ArgoApplication {
    metadata: ArgoMetadata,
    #[serde(default)]
    status: Option<ArgoStatus>,
}

#[derive(Debug, Deserialize)]
struct ArgoMetadata {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ArgoStatus {
    #[serde(default)]
    sync: Option<ArgoStatusField>,
    #[serde(default)]
    health: Option<ArgoStatusField>,
}

#[derive(Debug, Deserialize)]
struct ArgoStatusField {
    #[serde(default)]
    status: Option<String>,
}

impl ArgoApplication {
    fn into_application(self) -> Application {
        let status = self.status.unwrap_or_default();
        let label = |field: Option<ArgoStatusField>| {
            field
                .and_then(|f| f.status)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_STATUS.to_string())
        };
        Application {
            name: self.metadata.name,
            status: AppStatus {
                sync_status: label(status.sync),
                health_status: label(status.health),
            },
        }
    }
}

/// Parse an application-list body.
///
/// `"items": null` is how Argo CD encodes zero applications; a missing
/// `items` key is a payload error.
pub fn parse_applications(body: &str) -> Result<Vec<Application>> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        ArgoWatchError::InventoryPayload(format!(
            "not JSON ({e}): {}",
            truncate(body, MAX_ERROR_BODY)
        ))
    })?;

    let items = match value.get("items") {
        None => {
            return Err(ArgoWatchError::InventoryPayload(format!(
                "missing 'items' field: {}",
                truncate(body, MAX_ERROR_BODY)
            )));
        }
        Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(items) => items.clone(),
    };

    let items: Vec<ArgoApplication> = serde_json::from_value(items)
        .map_err(|e| ArgoWatchError::InventoryPayload(format!("bad application item: {e}")))?;

    Ok(items
        .into_iter()
        .map(ArgoApplication::into_application)
        .collect())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}
