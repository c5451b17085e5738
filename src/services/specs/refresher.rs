//! Periodic background refresh of the spec registry.
//!
//! The eager startup refresh is done by the caller (`app::run`) before the
//! listener is bound; this task only handles the following cycles.
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::registry::SpecRegistry;

/// Handle to the running refresh loop. Dropping it does not stop the task;
/// call [`RefreshTask::stop`].
#[derive(Debug)]
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Refresh `registry` every `period`, first tick one `period` from now.
    ///
    /// `period` must be non-zero (validated in `Config`).
    pub fn spawn(registry: Arc<SpecRegistry>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            // Fixed delay between cycles: a slow refresh pushes the next one back
            // instead of triggering a burst.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let report = registry.refresh().await;
                if report.skipped {
                    continue;
                }
                tracing::debug!(
                    generation = report.generation,
                    published = report.published,
                    failed = report.failures().count(),
                    "periodic spec refresh finished"
                );
            }
        });

        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
