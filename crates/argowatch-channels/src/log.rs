//! Log-only sink for `--dry-run`: messages go to the tracing output.

use argowatch_core::error::Result;
use argowatch_core::traits::Notifier;
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, message: &str) -> Result<()> {
        tracing::info!("📢 [dry-run] {}", message.replace('\n', " | "));
        Ok(())
    }
}
