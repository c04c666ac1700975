//! Handler for the externally-invocable snapshot writer
//! (`POST /functions/v1/update-player-data`).
//!
//! The tick controller saves snapshots in-process; this endpoint exists
//! for operator tooling (backfills, corrections) and for compatibility
//! with scheduler setups that keep the writer external. It bypasses the
//! decision engine entirely.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use eggboard_core::decision::Decision;
use eggboard_core::error::CoreError;
use eggboard_core::player::PlayerRecord;
use eggboard_core::types::SnapshotDate;
use eggboard_db::repositories::SnapshotRepo;
use eggboard_events::SaveEmailContext;

use crate::auth::jwt::verify_session_token;
use crate::error::{AppError, AppResult};
use crate::ingest::snapshot_writer::{self, SnapshotSaveOutcome};
use crate::middleware::secret::{is_internal_call, operator_token_matches};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /update-player-data`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePlayerDataRequest {
    /// Marker mirrored from internal invocations; authentication relies
    /// on the headers, not this flag.
    pub internal_call: bool,
    /// Already-fetched records; when absent the handler fetches upstream.
    pub players: Option<Vec<PlayerRecord>>,
    /// Target date; defaults to today (UTC).
    pub snapshot_date: Option<SnapshotDate>,
    /// Overwrite a date that was already imported.
    pub force_update: bool,
    /// Build and count rows without writing.
    pub dry_run: bool,
    /// Send the save notification after writing.
    pub send_email: bool,
    /// Optional sync statistics to embed in the notification.
    pub email_context: Option<serde_json::Value>,
}

/// Per-table write counts.
#[derive(Debug, Serialize)]
pub struct WriteCounts {
    pub inserted: u64,
    pub errors: u64,
}

/// Response body for `POST /update-player-data`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayerDataResponse {
    pub success: bool,
    pub snapshot_date: SnapshotDate,
    pub player_count: usize,
    pub snapshots: WriteCounts,
    pub eggday_gains: WriteCounts,
    pub errors: Vec<String>,
    pub refresh_materialized_views_response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// POST /functions/v1/update-player-data
///
/// Authenticated either with the preshared `x-secret-token` header
/// (operator tooling) or as an internal call (`x-internal-call: true`
/// plus a valid bearer token).
pub async fn update_player_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<UpdatePlayerDataRequest>,
) -> AppResult<Json<UpdatePlayerDataResponse>> {
    authorize(&state, &headers)?;

    let now = Utc::now();
    let snapshot_date = input.snapshot_date.unwrap_or_else(|| now.date_naive());

    // 1. Source the records.
    let records: Vec<PlayerRecord> = match input.players {
        Some(players) if !players.is_empty() => players,
        Some(_) => {
            return Err(AppError::BadRequest(
                "players must not be an empty array".into(),
            ))
        }
        None => state.wonky.fetch().await.map_err(|e| {
            AppError::Core(CoreError::Upstream(format!("Upstream fetch failed: {e}")))
        })?,
    };

    // 2. Re-import guard: an already-imported date needs forceUpdate.
    if !input.force_update && !input.dry_run {
        if let Some(meta) = SnapshotRepo::metadata_for_date(&state.pool, snapshot_date).await? {
            return Ok(Json(UpdatePlayerDataResponse {
                success: false,
                snapshot_date,
                player_count: records.len(),
                snapshots: WriteCounts {
                    inserted: 0,
                    errors: 0,
                },
                eggday_gains: WriteCounts {
                    inserted: 0,
                    errors: 0,
                },
                errors: vec![format!(
                    "Snapshot for {snapshot_date} already exists ({} rows); set forceUpdate to overwrite",
                    meta.record_count
                )],
                refresh_materialized_views_response: String::new(),
                email_sent: None,
                email_error: None,
            }));
        }
    }

    // 3. Dry run: count what would be written, touch nothing.
    if input.dry_run {
        let snapshot_rows = snapshot_writer::build_snapshot_rows(&records, snapshot_date);
        let eggday_rows = snapshot_writer::build_eggday_rows(&records);
        return Ok(Json(UpdatePlayerDataResponse {
            success: true,
            snapshot_date,
            player_count: records.len(),
            snapshots: WriteCounts {
                inserted: snapshot_rows.len() as u64,
                errors: 0,
            },
            eggday_gains: WriteCounts {
                inserted: eggday_rows.len() as u64,
                errors: 0,
            },
            errors: Vec::new(),
            refresh_materialized_views_response: "dry run".to_string(),
            email_sent: None,
            email_error: None,
        }));
    }

    // 4. Write.
    let outcome = snapshot_writer::save_snapshot(&state.pool, &records, snapshot_date, now).await;

    // 5. Optional notification.
    let (email_sent, email_error) = if input.send_email {
        let decision = decision_from_email_context(input.email_context.as_ref(), &records);
        let ctx = SaveEmailContext {
            decision: &decision,
            snapshot_date,
            snapshot_rows_inserted: outcome.snapshot_rows_inserted,
            snapshot_errors: outcome.snapshot_errors,
            eggday_rows_inserted: outcome.eggday_rows_inserted,
            eggday_errors: outcome.eggday_errors,
            error_messages: &outcome.error_messages,
            refresh_result: &outcome.refresh_result,
        };
        match state.notifier.snapshot_saved(&ctx).await {
            Ok(()) => (Some(true), None),
            Err(message) => (Some(false), Some(message)),
        }
    } else {
        (None, None)
    };

    Ok(Json(response_from_outcome(
        outcome,
        email_sent,
        email_error,
    )))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    if operator_token_matches(headers, &state.config.secret_token) {
        return Ok(());
    }

    if is_internal_call(headers) {
        let token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if let Some(token) = token {
            if verify_session_token(token, &state.config.jwt).is_ok() {
                return Ok(());
            }
        }
    }

    Err(AppError::Core(CoreError::Unauthorized(
        "Missing or invalid operator credentials".into(),
    )))
}

fn response_from_outcome(
    outcome: SnapshotSaveOutcome,
    email_sent: Option<bool>,
    email_error: Option<String>,
) -> UpdatePlayerDataResponse {
    UpdatePlayerDataResponse {
        success: outcome.snapshot_errors == 0,
        snapshot_date: outcome.snapshot_date,
        player_count: outcome.player_count,
        snapshots: WriteCounts {
            inserted: outcome.snapshot_rows_inserted,
            errors: outcome.snapshot_errors,
        },
        eggday_gains: WriteCounts {
            inserted: outcome.eggday_rows_inserted,
            errors: outcome.eggday_errors,
        },
        errors: outcome.error_messages,
        refresh_materialized_views_response: outcome.refresh_result,
        email_sent,
        email_error,
    }
}

/// Build the decision values embedded in an operator-triggered save email.
///
/// The operator may pass sync statistics via `emailContext`; anything
/// missing defaults to a fully-synced view of the posted records.
fn decision_from_email_context(
    context: Option<&serde_json::Value>,
    records: &[PlayerRecord],
) -> Decision {
    let get_f64 = |key: &str, default: f64| -> f64 {
        context
            .and_then(|c| c.get(key))
            .and_then(|v| v.as_f64())
            .unwrap_or(default)
    };
    let get_usize = |key: &str, default: usize| -> usize {
        context
            .and_then(|c| c.get(key))
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(default)
    };

    let total = records.len();
    Decision {
        should_save: true,
        sync_percentage: get_f64("syncPercentage", 100.0),
        players_in_sync_window: get_usize("playersInSyncWindow", total),
        total_non_excluded: get_usize("totalNonExcluded", total),
        total_received: get_usize("totalReceived", total),
        excluded_count: get_usize("excludedCount", 0),
        lowest_updated_at: None,
        hours_since_lowest_update: 0.0,
        hours_since_last_save: 0.0,
        reason: "Manual import".to_string(),
        is_pending_sync: false,
        pending_attempt_count: 0,
        missing: Vec::new(),
    }
}
