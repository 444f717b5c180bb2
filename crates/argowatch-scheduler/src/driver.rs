//! Scheduler driver — runs the reconciler on a fixed cadence.
//!
//! Two states: `Running` sleeps `interval` after a good cycle, `Backoff`
//! sleeps a jittered `error_backoff` after a failed one. Errors never leave
//! the loop; only the shutdown future ends it, at the next sleep.

use std::future::Future;
use std::time::Duration;

use argowatch_core::config::ScheduleConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::backoff;
use crate::reconciler::Reconciler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Backoff,
}

pub struct Driver {
    reconciler: Reconciler,
    interval: Duration,
    error_backoff: Duration,
    jitter_ratio: f64,
    state: DriverState,
    rng: StdRng,
    cycles: u64,
    failures: u64,
}

impl Driver {
    pub fn new(reconciler: Reconciler, config: &ScheduleConfig) -> Self {
        Self {
            reconciler,
            interval: Duration::from_secs(config.interval_secs),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
            jitter_ratio: config.jitter_ratio,
            state: DriverState::Running,
            rng: StdRng::from_entropy(),
            cycles: 0,
            failures: 0,
        }
    }

    /// Use a fixed seed for the backoff jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Run one cycle, update the state and return how long to sleep.
    pub async fn step(&mut self) -> Duration {
        self.cycles += 1;
        match self.reconciler.run_cycle().await {
            Ok(report) => {
                if self.state == DriverState::Backoff {
                    tracing::info!("✅ Recovered after backoff");
                }
                self.state = DriverState::Running;
                if report.events() > 0 || report.failed > 0 {
                    tracing::info!(
                        "📣 Cycle {}: +{} ~{} -{} ({} delivered, {} failed)",
                        self.cycles,
                        report.added,
                        report.changed,
                        report.removed,
                        report.delivered,
                        report.failed
                    );
                } else {
                    tracing::debug!("Cycle {}: no changes", self.cycles);
                }
                self.interval
            }
            Err(e) => {
                self.failures += 1;
                self.state = DriverState::Backoff;
                let delay = backoff::jittered(self.error_backoff, self.jitter_ratio, &mut self.rng);
                tracing::error!(
                    "❌ Cycle {} failed: {e} (retrying in {:.1}s)",
                    self.cycles,
                    delay.as_secs_f64()
                );
                delay
            }
        }
    }

    /// Loop until `shutdown` resolves. Returns the number of cycles run.
    pub async fn run<F>(mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            "⏰ Watching Argo CD applications (every {}s, backoff {}s)",
            self.interval.as_secs(),
            self.error_backoff.as_secs()
        );
        tokio::pin!(shutdown);

        loop {
            let delay = self.step().await;
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(
                        "🛑 Shutdown requested after {} cycles ({} failed)",
                        self.cycles,
                        self.failures
                    );
                    return self.cycles;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
