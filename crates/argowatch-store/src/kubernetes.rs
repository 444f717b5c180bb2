//! Kubernetes custom-resource snapshot store.
//!
//! The snapshot lives in `spec.state` of a namespaced custom object
//! (`notifiers.argocd-notifier.example.com/v1` by default). Talks to the API
//! server directly with the pod's service-account token and CA bundle.
//! Writes carry `metadata.resourceVersion`. A stale version (409, or 404 on
//! PUT) is refreshed with one GET and the write is retried once; a second
//! conflict is an error.

use argowatch_core::config::KubernetesStoreConfig;
use argowatch_core::error::{ArgoWatchError, Result};
use argowatch_core::traits::SnapshotStore;
use argowatch_core::types::Snapshot;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

pub struct KubernetesStore {
    client: reqwest::Client,
    collection_url: String,
    resource_url: String,
    api_version: String,
    kind: String,
    namespace: String,
    record: String,
    token_path: PathBuf,
    /// Last `metadata.resourceVersion` we saw for the record.
    resource_version: Mutex<Option<String>>,
}

/// Result of one PUT/POST.
enum WriteOutcome {
    Written(Option<String>),
    /// 404 on PUT or 409 on either: our view of the object is out of date.
    Stale,
}

impl KubernetesStore {
    pub fn new(config: &KubernetesStoreConfig, record: &str) -> Result<Self> {
        Self::with_env(config, record, |key| std::env::var(key).ok())
    }

    /// Like [`new`](Self::new), resolving the in-cluster address through `lookup`.
    pub fn with_env<F>(config: &KubernetesStoreConfig, record: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = match &config.api_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => in_cluster_url(&lookup).ok_or_else(|| {
                ArgoWatchError::Config(
                    "kubernetes store: set store.kubernetes.api_url or run in-cluster \
                     (KUBERNETES_SERVICE_HOST / KUBERNETES_SERVICE_PORT)"
                        .into(),
                )
            })?,
        };

        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        let ca_path = PathBuf::from(&config.ca_path);
        if ca_path.exists() {
            let pem = std::fs::read(&ca_path)?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                ArgoWatchError::Config(format!("Invalid CA bundle {}: {e}", ca_path.display()))
            })?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder.build().map_err(|e| {
            ArgoWatchError::Config(format!("Failed to build Kubernetes client: {e}"))
        })?;

        let collection_url = format!(
            "{api_url}/apis/{}/{}/namespaces/{}/{}",
            config.group, config.version, config.namespace, config.plural
        );
        let resource_url = format!("{collection_url}/{record}");

        Ok(Self {
            client,
            collection_url,
            resource_url,
            api_version: format!("{}/{}", config.group, config.version),
            kind: config.kind.clone(),
            namespace: config.namespace.clone(),
            record: record.to_string(),
            token_path: PathBuf::from(&config.token_path),
            resource_version: Mutex::new(None),
        })
    }

    /// Re-read on every request: projected service-account tokens rotate.
    async fn token(&self) -> Option<String> {
        tokio::fs::read_to_string(&self.token_path)
            .await
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    async fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, url);
        match self.token().await {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn cached_version(&self) -> Option<String> {
        self.resource_version.lock().ok().and_then(|rv| rv.clone())
    }

    fn remember_version(&self, version: Option<String>) {
        if let Ok(mut rv) = self.resource_version.lock() {
            *rv = version;
        }
    }

    /// GET the record. `None` when it does not exist.
    async fn get_object(&self) -> Result<Option<serde_json::Value>> {
        let resp = self
            .request(Method::GET, &self.resource_url)
            .await
            .send()
            .await
            .map_err(|e| ArgoWatchError::Store(format!("GET {}: {e}", self.resource_url)))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            self.remember_version(None);
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ArgoWatchError::Store(format!(
                "GET {} returned {status}: {body}",
                self.resource_url
            )));
        }

        let object: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ArgoWatchError::Store(format!("Invalid custom object: {e}")))?;
        self.remember_version(resource_version(&object));
        Ok(Some(object))
    }

    fn body(&self, state: &serde_json::Value, version: Option<&str>) -> serde_json::Value {
        let mut metadata = serde_json::json!({
            "name": self.record,
            "namespace": self.namespace,
        });
        if let Some(v) = version {
            metadata["resourceVersion"] = serde_json::Value::String(v.to_string());
        }
        serde_json::json!({
            "apiVersion": self.api_version,
            "kind": self.kind,
            "metadata": metadata,
            "spec": { "state": state },
        })
    }

    async fn write(
        &self,
        method: Method,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<WriteOutcome> {
        let resp = self
            .request(method.clone(), url)
            .await
            .json(body)
            .send()
            .await
            .map_err(|e| ArgoWatchError::Store(format!("{method} {url}: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            let version = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|o| resource_version(&o));
            return Ok(WriteOutcome::Written(version));
        }
        let gone = method == Method::PUT && status == StatusCode::NOT_FOUND;
        if status == StatusCode::CONFLICT || gone {
            return Ok(WriteOutcome::Stale);
        }
        let text = resp.text().await.unwrap_or_default();
        Err(ArgoWatchError::Store(format!("{method} {url} returned {status}: {text}")))
    }
}

#[async_trait]
impl SnapshotStore for KubernetesStore {
    fn name(&self) -> &str {
        "kubernetes"
    }

    async fn load(&self) -> Result<Snapshot> {
        let Some(object) = self.get_object().await? else {
            tracing::info!(
                "📭 No {} '{}' in namespace {} yet, starting empty",
                self.kind,
                self.record,
                self.namespace
            );
            return Ok(Snapshot::new());
        };
        match object.pointer("/spec/state") {
            None | Some(serde_json::Value::Null) => Ok(Snapshot::new()),
            Some(state) => serde_json::from_value(state.clone()).map_err(|e| {
                ArgoWatchError::Store(format!("Invalid spec.state in '{}': {e}", self.record))
            }),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let state = serde_json::to_value(snapshot)?;
        let mut version = match self.cached_version() {
            Some(v) => Some(v),
            None => self.get_object().await?.and_then(|o| resource_version(&o)),
        };

        // Second pass only after refreshing a stale resourceVersion.
        for attempt in 0..2 {
            let outcome = match &version {
                Some(v) => {
                    let body = self.body(&state, Some(v));
                    self.write(Method::PUT, &self.resource_url, &body).await?
                }
                None => {
                    let body = self.body(&state, None);
                    self.write(Method::POST, &self.collection_url, &body).await?
                }
            };
            match outcome {
                WriteOutcome::Written(new_version) => {
                    self.remember_version(new_version);
                    tracing::debug!(
                        "💾 Saved {} apps to {} '{}'",
                        snapshot.len(),
                        self.kind,
                        self.record
                    );
                    return Ok(());
                }
                WriteOutcome::Stale if attempt == 0 => {
                    tracing::debug!(
                        "🔄 {} '{}' changed underneath us, refreshing",
                        self.kind,
                        self.record
                    );
                    version = self.get_object().await?.and_then(|o| resource_version(&o));
                }
                WriteOutcome::Stale => {}
            }
        }

        Err(ArgoWatchError::Store(format!(
            "{} '{}' kept conflicting after refresh",
            self.kind, self.record
        )))
    }
}

fn resource_version(object: &serde_json::Value) -> Option<String> {
    object
        .pointer("/metadata/resourceVersion")
        .and_then(|v| v.as_str())
        .map(String::from)
}

fn in_cluster_url<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("KUBERNETES_SERVICE_HOST").filter(|h| !h.is_empty())?;
    let port = lookup("KUBERNETES_SERVICE_PORT")
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "443".into());
    if host.contains(':') {
        Some(format!("https://[{host}]:{port}"))
    } else {
        Some(format!("https://{host}:{port}"))
    }
}
