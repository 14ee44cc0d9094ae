//! Periodic recurrence worker.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use crate::Engine;

/// Drives `Engine::run_recurrence_sweep` on a fixed interval.
///
/// Several workers may point at the same store, in the same process or
/// not; the per-occurrence claim inside the sweep keeps each due item
/// materialized exactly once.
#[derive(Debug)]
pub struct RecurrenceScheduler {
    engine: Arc<Engine>,
    interval: Duration,
}

impl RecurrenceScheduler {
    #[must_use]
    pub fn new(engine: Arc<Engine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Runs until the owning task is dropped, sweeping once per tick.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.engine.run_recurrence_sweep(Utc::now()).await {
                Ok(report) => {
                    if report.materialized > 0 || report.failed > 0 {
                        tracing::info!(
                            materialized = report.materialized,
                            skipped = report.skipped,
                            failed = report.failed,
                            "recurrence sweep finished"
                        );
                    }
                }
                Err(err) => tracing::error!(error = %err, "recurrence sweep failed"),
            }
        }
    }
}
