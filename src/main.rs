//! # ArgoWatch — Argo CD change notifier
//!
//! Polls the Argo CD application list and posts a chat message for every
//! application that appears, changes sync/health status, or disappears.
//!
//! Usage:
//!   argowatch                          # config from env (+ ~/.argowatch/config.toml)
//!   argowatch --config watch.toml      # explicit config file
//!   argowatch --dry-run                # log messages instead of sending them
//!   argowatch --check-config           # validate, print summary, exit

use anyhow::{Context, Result};
use argowatch_argocd::ArgoCdClient;
use argowatch_channels::notifier_from_config;
use argowatch_core::config::ArgoWatchConfig;
use argowatch_scheduler::{Driver, Reconciler};
use argowatch_store::store_from_config;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "argowatch",
    version,
    about = "👀 ArgoWatch — Argo CD application change notifier"
)]
struct Cli {
    /// Config file (default: ~/.argowatch/config.toml when it exists)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Log notifications instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Validate configuration, print a summary and exit
    #[arg(long)]
    check_config: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_logging(cli: &Cli) {
    let filter = if cli.verbose {
        "argowatch=debug"
    } else {
        "argowatch=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(cli: &Cli) -> Result<ArgoWatchConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = PathBuf::from(shellexpand::tilde(path).to_string());
            ArgoWatchConfig::load_from(&path)?
        }
        None => ArgoWatchConfig::load()?,
    };
    config.apply_env()?;
    config.validate_with(cli.dry_run)?;
    Ok(config)
}

/// Resolves on Ctrl-C, or SIGTERM on unix (what Kubernetes sends on pod stop).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("⚠️ Ctrl-C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("⚠️ SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = load_config(&cli).context("Invalid configuration")?;

    if cli.check_config {
        println!("👀 ArgoWatch v{} — configuration OK\n", env!("CARGO_PKG_VERSION"));
        println!("{config:#?}");
        return Ok(());
    }

    let source = ArgoCdClient::new(&config.argocd)?;
    let notifier = notifier_from_config(&config.notify, cli.dry_run)?;
    let store = store_from_config(&config.store)?;

    tracing::info!("👀 ArgoWatch v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("   🌐 Argo CD:   {}", config.argocd.server);
    tracing::info!("   📢 Notifier:  {}", notifier.name());
    tracing::info!(
        "   🗄️  Snapshot:  {} record '{}' (on save failure: {:?})",
        store.name(),
        config.store.record,
        config.store.on_save_failure
    );

    let reconciler = Reconciler::new(
        Box::new(source),
        notifier,
        store,
        config.store.on_save_failure,
    );
    Driver::new(reconciler, &config.schedule)
        .run(shutdown_signal())
        .await;

    tracing::info!("👋 ArgoWatch stopped");
    Ok(())
}
