//! # ArgoWatch Channels
//! Notification sinks. Each one makes a single delivery attempt per message.

pub mod log;
pub mod telegram;
pub mod webhook;

pub use log::LogNotifier;
pub use telegram::TelegramNotifier;
pub use webhook::WebhookNotifier;

use argowatch_core::config::{NotifyChannelKind, NotifyConfig};
use argowatch_core::error::Result;
use argowatch_core::traits::Notifier;

/// Build the configured notifier. `dry_run` swaps it for [`LogNotifier`].
pub fn notifier_from_config(config: &NotifyConfig, dry_run: bool) -> Result<Box<dyn Notifier>> {
    if dry_run {
        return Ok(Box::new(LogNotifier::new()));
    }
    Ok(match config.channel {
        NotifyChannelKind::Telegram => Box::new(TelegramNotifier::new(
            &config.telegram,
            config.timeout_secs,
        )?),
        NotifyChannelKind::Webhook => {
            Box::new(WebhookNotifier::new(&config.webhook, config.timeout_secs)?)
        }
    })
}
