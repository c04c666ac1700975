//! In-process tick scheduler.
//!
//! Deployments without an external scheduler can enable this loop
//! (`CRON_SCHEDULER_ENABLED=true`) to drive the controller on the
//! configured interval. Ticks are serialized by construction: the next
//! interval fires only after the previous tick returned.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::controller::{self, TickContext};
use crate::state::AppState;

/// Run the tick scheduler loop until `cancel` is triggered.
pub async fn run(state: AppState, cancel: CancellationToken) {
    let period = Duration::from_secs(state.config.decision.cron_interval_minutes as u64 * 60);
    tracing::info!(
        interval_secs = period.as_secs(),
        "Tick scheduler started"
    );

    let mut interval = tokio::time::interval(period);
    // The immediate first tick is skipped; the service has just started
    // and the external world has not changed since the last deployment's
    // tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Tick scheduler stopping");
                break;
            }
            _ = interval.tick() => {
                let report = controller::run_tick(&TickContext::from(&state), Utc::now()).await;
                if report.success {
                    tracing::info!(
                        player_count = report.player_count,
                        snapshot_saved = report.snapshot_saved,
                        "Scheduled tick finished"
                    );
                } else {
                    tracing::warn!(
                        error = report.error.as_deref().unwrap_or("unknown"),
                        "Scheduled tick aborted"
                    );
                }
            }
        }
    }
}
