use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::use_cases::reconciliation::ReconciliationUseCases;

const SWEEP_BATCH_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
    pub interval: Duration,
    pub min_age: chrono::Duration,
    pub max_age: chrono::Duration,
}

/// Server-side resume for payments nobody is watching any more. Runs until
/// `shutdown` is cancelled.
pub async fn run_pending_sweep_loop(
    reconciliation: Arc<ReconciliationUseCases>,
    settings: SweepSettings,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Pending payment sweeper started (every {}s, min age {}s)",
        settings.interval.as_secs(),
        settings.min_age.num_seconds()
    );

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Pending payment sweeper stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        match reconciliation
            .sweep_pending(settings.min_age, settings.max_age, SWEEP_BATCH_SIZE)
            .await
        {
            Ok(report) if report.checked > 0 => {
                info!(
                    checked = report.checked,
                    resolved = report.resolved,
                    activated = report.activated,
                    "Pending payment sweep finished"
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Pending payment sweep failed");
            }
        }
    }
}
