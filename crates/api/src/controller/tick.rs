//! One controller tick.
//!
//! Per tick: fetch the upstream poll, refresh the current-state cache,
//! evaluate the snapshot decision, then save, park, or skip — and finally
//! check the outage alert. A failed fetch aborts the tick before any state
//! is touched. Email failures never propagate. Ticks are serialized by the
//! scheduler; the controller does not self-lock.

use serde::Serialize;

use eggboard_core::decision::{self, Decision, DecisionConfig, PendingParcel};
use eggboard_core::types::Timestamp;
use eggboard_db::repositories::{ControllerStateRepo, ControllerStateUpdate, ExcludedPlayerRepo};
use eggboard_db::DbPool;
use eggboard_events::{Notifier, SaveEmailContext, WeekNoUpdateContext};
use eggboard_wonky::WonkyClient;

use crate::ingest::snapshot_writer::{self, SnapshotSaveOutcome};
use crate::ingest::cache_writer;
use crate::state::AppState;

/// The collaborators one tick needs: the upstream, the database, the
/// notification dispatcher, and the engine tunables. Borrowed from
/// [`AppState`] in production; tests assemble one directly around stub
/// collaborators.
pub struct TickContext<'a> {
    pub pool: &'a DbPool,
    pub wonky: &'a WonkyClient,
    pub notifier: &'a Notifier,
    pub decision: &'a DecisionConfig,
}

impl<'a> From<&'a AppState> for TickContext<'a> {
    fn from(state: &'a AppState) -> Self {
        Self {
            pool: &state.pool,
            wonky: state.wonky.as_ref(),
            notifier: state.notifier.as_ref(),
            decision: &state.config.decision,
        }
    }
}

/// Subset of the decision reported by the cron endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSummary {
    pub should_save: bool,
    pub sync_percentage: f64,
    pub reason: String,
    pub is_pending_sync: bool,
}

impl From<&Decision> for DecisionSummary {
    fn from(decision: &Decision) -> Self {
        Self {
            should_save: decision.should_save,
            sync_percentage: decision.sync_percentage,
            reason: decision.reason.clone(),
            is_pending_sync: decision.is_pending_sync,
        }
    }
}

/// Outcome of one tick, serialized verbatim as the cron endpoint response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub success: bool,
    pub timestamp: Timestamp,
    pub leaderboard_cache_updated: bool,
    pub player_count: usize,
    pub excluded_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionSummary>,
    pub snapshot_saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_result: Option<SnapshotSaveOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TickReport {
    fn aborted(now: Timestamp, error: String) -> Self {
        Self {
            success: false,
            timestamp: now,
            leaderboard_cache_updated: false,
            player_count: 0,
            excluded_count: 0,
            decision: None,
            snapshot_saved: false,
            snapshot_result: None,
            error: Some(error),
        }
    }
}

/// Execute one controller tick. The clock is a parameter so tests drive
/// the tick against a fixed instant.
pub async fn run_tick(ctx: &TickContext<'_>, now: Timestamp) -> TickReport {
    // 1. Fetch. A failed or empty poll aborts the tick with no mutation.
    let records = match ctx.wonky.fetch().await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(error = %e, "Upstream fetch failed, aborting tick");
            return TickReport::aborted(now, format!("Upstream fetch failed: {e}"));
        }
    };

    // 2. Exclusion registry.
    let exclusions = match ExcludedPlayerRepo::list_ids(ctx.pool).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load exclusion registry, aborting tick");
            return TickReport::aborted(now, format!("Failed to load exclusions: {e}"));
        }
    };

    // 3. Cache always follows the poll, even when no snapshot is taken.
    // A partial cache write is reported but does not stop the tick; the
    // next poll overwrites it.
    let mut error = None;
    let cache_updated = match cache_writer::replace_cache(ctx.pool, &records, now).await {
        Ok(written) => {
            tracing::debug!(written, "Leaderboard cache replaced");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Cache replace failed");
            error = Some(format!("Cache replace failed: {e}"));
            false
        }
    };

    // 4. Decide.
    if let Err(e) = ControllerStateRepo::upsert_initial(ctx.pool, now).await {
        tracing::error!(error = %e, "Failed to seed controller state, aborting tick");
        return TickReport::aborted(now, format!("Failed to seed controller state: {e}"));
    }
    let controller_state = match ControllerStateRepo::load(ctx.pool).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return TickReport::aborted(now, "Controller state missing after seed".to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load controller state, aborting tick");
            return TickReport::aborted(now, format!("Failed to load controller state: {e}"));
        }
    };
    let state_view = controller_state.to_view();

    let decision = decision::decide(&records, &exclusions, &state_view, now, ctx.decision);
    tracing::info!(
        should_save = decision.should_save,
        sync_percentage = decision.sync_percentage,
        reason = %decision.reason,
        "Snapshot decision"
    );

    if let Ok(decision_json) = serde_json::to_value(&decision) {
        let record = ControllerStateUpdate {
            last_decision_at: Some(now),
            last_decision_result: Some(decision_json),
            ..Default::default()
        };
        if let Err(e) = ControllerStateRepo::update(ctx.pool, &record).await {
            tracing::error!(error = %e, "Failed to record decision");
        }
    }

    // 5. Save, park, or skip.
    let mut snapshot_result = None;
    if decision.should_save {
        let snapshot_date = now.date_naive();
        let outcome = snapshot_writer::save_snapshot(ctx.pool, &records, snapshot_date, now).await;

        // The state is advanced even when some batches failed; retrying a
        // partial save would thrash against the cooldown, and the email
        // below carries the exact failure list.
        let mark_saved = ControllerStateUpdate {
            last_saved_at: Some(now),
            clear_pending: true,
            ..Default::default()
        };
        if let Err(e) = ControllerStateRepo::update(ctx.pool, &mark_saved).await {
            tracing::error!(error = %e, "Failed to record successful save");
        }

        let email_ctx = SaveEmailContext {
            decision: &decision,
            snapshot_date,
            snapshot_rows_inserted: outcome.snapshot_rows_inserted,
            snapshot_errors: outcome.snapshot_errors,
            eggday_rows_inserted: outcome.eggday_rows_inserted,
            eggday_errors: outcome.eggday_errors,
            error_messages: &outcome.error_messages,
            refresh_result: &outcome.refresh_result,
        };
        // Email failures are audited by the notifier and never fail a tick.
        let _ = if decision.sync_percentage < 100.0 {
            ctx.notifier.partial_sync(&email_ctx).await
        } else {
            ctx.notifier.snapshot_saved(&email_ctx).await
        };

        snapshot_result = Some(outcome);
    } else if decision.is_pending_sync {
        let parcel = PendingParcel {
            records: records.clone(),
            captured_at: now,
            sync_percentage: decision.sync_percentage,
            attempt_count: decision.pending_attempt_count,
            missing: decision.missing.clone(),
        };
        let first_attempt = state_view.pending_first_attempt.unwrap_or(now);
        let meta = serde_json::json!({
            "reason": decision.reason,
            "missingCount": decision.missing.len(),
        });

        match serde_json::to_value(&parcel) {
            Ok(parcel_json) => {
                let park = ControllerStateUpdate {
                    pending: Some(parcel_json),
                    pending_first_attempt: Some(first_attempt),
                    pending_attempt_count: Some(decision.pending_attempt_count),
                    pending_meta: Some(meta),
                    ..Default::default()
                };
                if let Err(e) = ControllerStateRepo::update(ctx.pool, &park).await {
                    tracing::error!(error = %e, "Failed to park pending parcel");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to serialize pending parcel"),
        }
    }

    // 6. Outage alert, evaluated against the state as loaded this tick.
    if decision::should_send_week_no_update_alert(&state_view, now, ctx.decision) {
        let _ = ctx
            .notifier
            .week_no_update(&WeekNoUpdateContext {
                last_saved_at: state_view.last_saved_at,
                hours_since_last_save: decision.hours_since_last_save,
            })
            .await;
        let record_alert = ControllerStateUpdate {
            last_email_sent_at: Some(now),
            last_email_type: Some("week_no_update".to_string()),
            ..Default::default()
        };
        if let Err(e) = ControllerStateRepo::update(ctx.pool, &record_alert).await {
            tracing::error!(error = %e, "Failed to record alert email");
        }
    }

    TickReport {
        success: true,
        timestamp: now,
        leaderboard_cache_updated: cache_updated,
        player_count: records.len(),
        excluded_count: decision.excluded_count,
        snapshot_saved: decision.should_save,
        decision: Some(DecisionSummary::from(&decision)),
        snapshot_result,
        error,
    }
}
