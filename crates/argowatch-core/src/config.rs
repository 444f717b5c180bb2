//! ArgoWatch configuration system.
//!
//! Load order: TOML file (optional) → environment overrides → `validate()`.
//! The validated struct is built once in `main` and handed to each component.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ArgoWatchError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgoWatchConfig {
    #[serde(default)]
    pub argocd: ArgoCdConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl ArgoWatchConfig {
    /// Load config from the default path (~/.argowatch/config.toml), if present.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ArgoWatchError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| ArgoWatchError::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the ArgoWatch home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".argowatch")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the process env in production).
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ARGOCD_SERVER") {
            self.argocd.server = v;
        }
        if let Some(v) = get("ARGOCD_TOKEN") {
            self.argocd.token = v;
        }
        if let Some(v) = get("ARGOCD_VERIFY_TLS") {
            self.argocd.verify_tls = parse_env("ARGOCD_VERIFY_TLS", &v)?;
        }
        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.notify.telegram.bot_token = v;
        }
        if let Some(v) = get("TELEGRAM_CHAT_ID") {
            self.notify.telegram.chat_id = v;
        }
        if let Some(v) = get("NOTIFIER_RESOURCE_NAME") {
            self.store.record = v;
        }
        if let Some(v) = get("ARGOWATCH_STORE_BACKEND") {
            self.store.backend = parse_env("ARGOWATCH_STORE_BACKEND", &v)?;
        }
        if let Some(v) = get("ARGOWATCH_POLL_INTERVAL_SECS") {
            self.schedule.interval_secs = parse_env("ARGOWATCH_POLL_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("ARGOWATCH_ERROR_BACKOFF_SECS") {
            self.schedule.error_backoff_secs = parse_env("ARGOWATCH_ERROR_BACKOFF_SECS", &v)?;
        }
        Ok(())
    }

    /// Check that every required value is present before the loop starts.
    pub fn validate(&self) -> Result<()> {
        self.validate_with(false)
    }

    /// Like [`validate`](Self::validate); `dry_run` skips the notifier
    /// credentials since nothing is sent.
    pub fn validate_with(&self, dry_run: bool) -> Result<()> {
        let mut missing = Vec::new();

        if self.argocd.server.trim().is_empty() {
            missing.push("ARGOCD_SERVER (argocd.server)");
        }
        if self.argocd.token.trim().is_empty() {
            missing.push("ARGOCD_TOKEN (argocd.token)");
        }
        match self.notify.channel {
            _ if dry_run => {}
            NotifyChannelKind::Telegram => {
                if self.notify.telegram.bot_token.trim().is_empty() {
                    missing.push("TELEGRAM_BOT_TOKEN (notify.telegram.bot_token)");
                }
                if self.notify.telegram.chat_id.trim().is_empty() {
                    missing.push("TELEGRAM_CHAT_ID (notify.telegram.chat_id)");
                }
            }
            NotifyChannelKind::Webhook => {
                if self.notify.webhook.url.trim().is_empty() {
                    missing.push("notify.webhook.url");
                }
            }
        }
        if self.store.record.trim().is_empty() {
            missing.push("NOTIFIER_RESOURCE_NAME (store.record)");
        }

        if !missing.is_empty() {
            return Err(ArgoWatchError::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )));
        }

        if self.schedule.interval_secs == 0 || self.schedule.error_backoff_secs == 0 {
            return Err(ArgoWatchError::Config(
                "schedule intervals must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.schedule.jitter_ratio) {
            return Err(ArgoWatchError::Config(format!(
                "schedule.jitter_ratio must be within [0, 1], got {}",
                self.schedule.jitter_ratio
            )));
        }
        if !self.argocd.server.starts_with("http://") && !self.argocd.server.starts_with("https://")
        {
            return Err(ArgoWatchError::Config(format!(
                "argocd.server must start with http:// or https://, got '{}'",
                self.argocd.server
            )));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ArgoWatchError::Config(format!("Invalid {key}='{value}': {e}")))
}

fn bool_true() -> bool {
    true
}

/// Argo CD API access.
#[derive(Clone, Serialize, Deserialize)]
pub struct ArgoCdConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub token: String,
    /// Disabling verification is an explicit opt-in.
    #[serde(default = "bool_true")]
    pub verify_tls: bool,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    /// Only watch these Argo CD projects (empty = all).
    #[serde(default)]
    pub projects: Vec<String>,
    /// Label selector passed to the list call.
    #[serde(default)]
    pub selector: Option<String>,
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for ArgoCdConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            token: String::new(),
            verify_tls: true,
            timeout_secs: default_http_timeout(),
            projects: Vec::new(),
            selector: None,
        }
    }
}

impl fmt::Debug for ArgoCdConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgoCdConfig")
            .field("server", &self.server)
            .field("token", &redact(&self.token))
            .field("verify_tls", &self.verify_tls)
            .field("timeout_secs", &self.timeout_secs)
            .field("projects", &self.projects)
            .field("selector", &self.selector)
            .finish()
    }
}

/// Which sink receives notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyChannelKind {
    #[default]
    Telegram,
    Webhook,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub channel: NotifyChannelKind,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

fn default_notify_timeout() -> u64 {
    10
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel: NotifyChannelKind::default(),
            telegram: TelegramConfig::default(),
            webhook: WebhookConfig::default(),
            timeout_secs: default_notify_timeout(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".into()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_api(),
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Snapshot store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Kubernetes,
    File,
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kubernetes" | "k8s" => Ok(Self::Kubernetes),
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// What to do with the in-memory snapshot when `save` fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFailurePolicy {
    /// Keep the old snapshot and fail the cycle (the driver backs off).
    #[default]
    Rollback,
    /// Keep the new snapshot, mark it dirty and re-save next cycle.
    Advance,
}

/// Snapshot persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Name of the single record holding the snapshot.
    #[serde(default)]
    pub record: String,
    #[serde(default)]
    pub on_save_failure: SaveFailurePolicy,
    #[serde(default)]
    pub kubernetes: KubernetesStoreConfig,
    #[serde(default = "default_state_dir")]
    pub dir: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

fn default_state_dir() -> String {
    "~/.argowatch/state".into()
}
fn default_sqlite_path() -> String {
    "~/.argowatch/argowatch.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            record: String::new(),
            on_save_failure: SaveFailurePolicy::default(),
            kubernetes: KubernetesStoreConfig::default(),
            dir: default_state_dir(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

/// Custom-resource location for the `kubernetes` backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubernetesStoreConfig {
    /// Overrides the in-cluster API server address.
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_crd_group")]
    pub group: String,
    #[serde(default = "default_crd_version")]
    pub version: String,
    #[serde(default = "default_crd_plural")]
    pub plural: String,
    #[serde(default = "default_crd_kind")]
    pub kind: String,
    #[serde(default = "default_sa_token_path")]
    pub token_path: String,
    #[serde(default = "default_sa_ca_path")]
    pub ca_path: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_namespace() -> String {
    "argocd".into()
}
fn default_crd_group() -> String {
    "argocd-notifier.example.com".into()
}
fn default_crd_version() -> String {
    "v1".into()
}
fn default_crd_plural() -> String {
    "notifiers".into()
}
fn default_crd_kind() -> String {
    "Notifier".into()
}
fn default_sa_token_path() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/token".into()
}
fn default_sa_ca_path() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt".into()
}

impl Default for KubernetesStoreConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            namespace: default_namespace(),
            group: default_crd_group(),
            version: default_crd_version(),
            plural: default_crd_plural(),
            kind: default_crd_kind(),
            token_path: default_sa_token_path(),
            ca_path: default_sa_ca_path(),
            timeout_secs: default_http_timeout(),
        }
    }
}

/// Polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
    /// Backoff sleeps are stretched by up to this fraction.
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
}

fn default_interval() -> u64 {
    30
}
fn default_error_backoff() -> u64 {
    60
}
fn default_jitter_ratio() -> f64 {
    0.2
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            error_backoff_secs: default_error_backoff(),
            jitter_ratio: default_jitter_ratio(),
        }
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn complete_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("ARGOCD_SERVER", "https://argocd.example.com"),
            ("ARGOCD_TOKEN", "argo-secret"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-10042"),
            ("NOTIFIER_RESOURCE_NAME", "argocd-notifier-state"),
        ]
    }

    #[test]
    fn test_default_config() {
        let config = ArgoWatchConfig::default();
        assert!(config.argocd.verify_tls);
        assert_eq!(config.schedule.interval_secs, 30);
        assert_eq!(config.schedule.error_backoff_secs, 60);
        assert_eq!(config.store.backend, StoreBackend::Kubernetes);
        assert_eq!(config.store.on_save_failure, SaveFailurePolicy::Rollback);
        assert_eq!(config.store.kubernetes.namespace, "argocd");
        assert_eq!(config.notify.telegram.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [argocd]
            server = "https://argocd.internal"
            token = "t0k3n"
            verify_tls = false
            projects = ["payments"]

            [notify]
            channel = "webhook"
            [notify.webhook]
            url = "https://hooks.example.com/x"

            [store]
            backend = "sqlite"
            record = "prod"
            on_save_failure = "advance"

            [schedule]
            interval_secs = 15
        "#;

        let config: ArgoWatchConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.argocd.verify_tls);
        assert_eq!(config.argocd.projects, vec!["payments".to_string()]);
        assert_eq!(config.notify.channel, NotifyChannelKind::Webhook);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.on_save_failure, SaveFailurePolicy::Advance);
        assert_eq!(config.schedule.interval_secs, 15);
        assert_eq!(config.schedule.error_backoff_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: ArgoWatchConfig = toml::from_str("").unwrap();
        assert_eq!(config.argocd.timeout_secs, 30);
        assert_eq!(config.store.kubernetes.plural, "notifiers");
    }

    #[test]
    fn test_env_overrides_and_validate() {
        let mut config = ArgoWatchConfig::default();
        config.apply_env_from(env(&complete_env())).unwrap();
        assert_eq!(config.argocd.server, "https://argocd.example.com");
        assert_eq!(config.store.record, "argocd-notifier-state");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_required_is_config_error() {
        let mut config = ArgoWatchConfig::default();
        config
            .apply_env_from(env(&[("ARGOCD_SERVER", "https://argocd.example.com")]))
            .unwrap();
        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ArgoWatchError::Config(_)));
        assert!(msg.contains("ARGOCD_TOKEN"));
        assert!(msg.contains("TELEGRAM_CHAT_ID"));
        assert!(msg.contains("NOTIFIER_RESOURCE_NAME"));
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = ArgoWatchConfig::default();
        config.argocd.token = "from-file".into();
        config.apply_env_from(env(&[("ARGOCD_TOKEN", "  ")])).unwrap();
        assert_eq!(config.argocd.token, "from-file");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = ArgoWatchConfig::default();
        let err = config
            .apply_env_from(env(&[("ARGOCD_VERIFY_TLS", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("ARGOCD_VERIFY_TLS"));

        let err = config
            .apply_env_from(env(&[("ARGOWATCH_STORE_BACKEND", "etcd")]))
            .unwrap_err();
        assert!(err.to_string().contains("etcd"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = ArgoWatchConfig::default();
        config.apply_env_from(env(&complete_env())).unwrap();
        config.schedule.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dry_run_skips_notifier_credentials() {
        let mut config = ArgoWatchConfig::default();
        config
            .apply_env_from(env(&[
                ("ARGOCD_SERVER", "https://argocd.example.com"),
                ("ARGOCD_TOKEN", "argo-secret"),
                ("NOTIFIER_RESOURCE_NAME", "argocd-notifier-state"),
            ]))
            .unwrap();
        assert!(config.validate().is_err());
        assert!(config.validate_with(true).is_ok());

        config.argocd.token.clear();
        let err = config.validate_with(true).unwrap_err();
        assert!(err.to_string().contains("ARGOCD_TOKEN"));
        assert!(!err.to_string().contains("TELEGRAM"));
    }

    #[test]
    fn test_jitter_ratio_bounds() {
        let mut config = ArgoWatchConfig::default();
        config.apply_env_from(env(&complete_env())).unwrap();
        config.schedule.jitter_ratio = 1.0;
        assert!(config.validate().is_ok());
        config.schedule.jitter_ratio = 1.5;
        assert!(config.validate().is_err());
        config.schedule.jitter_ratio = -0.1;
        assert!(config.validate().is_err());
        config.schedule.jitter_ratio = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_scheme_required() {
        let mut config = ArgoWatchConfig::default();
        config.apply_env_from(env(&complete_env())).unwrap();
        config.argocd.server = "argocd.example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = ArgoWatchConfig::default();
        config.apply_env_from(env(&complete_env())).unwrap();
        let dump = format!("{config:?}");
        assert!(!dump.contains("argo-secret"));
        assert!(!dump.contains("123:abc"));
        assert!(dump.contains("<redacted>"));
    }

    #[test]
    fn test_home_dir() {
        let home = ArgoWatchConfig::home_dir();
        assert!(home.to_string_lossy().contains("argowatch"));
    }
}
