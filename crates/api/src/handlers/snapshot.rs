//! Handler for administrative snapshot deletion
//! (`POST /functions/v1/delete-snapshot`).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use eggboard_core::error::CoreError;
use eggboard_core::roles;
use eggboard_core::types::SnapshotDate;
use eggboard_db::repositories::SnapshotRepo;

use crate::auth::jwt::verify_session_token;
use crate::error::{AppError, AppResult};
use crate::middleware::secret::operator_token_matches;
use crate::state::AppState;

/// Request body for `POST /delete-snapshot`.
#[derive(Debug, Deserialize)]
pub struct DeleteSnapshotRequest {
    pub snapshot_date: Option<SnapshotDate>,
}

/// Response body for `POST /delete-snapshot`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSnapshotResponse {
    pub success: bool,
    pub snapshot_date: SnapshotDate,
    pub deleted_records: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<String>,
}

/// POST /functions/v1/delete-snapshot
///
/// Requires an admin session token or the preshared operator token.
/// Deletes every snapshot row for the supplied date and writes an audit
/// record.
pub async fn delete_snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<DeleteSnapshotRequest>,
) -> AppResult<Json<DeleteSnapshotResponse>> {
    let performed_by = authorize(&state, &headers)?;

    let snapshot_date = input
        .snapshot_date
        .ok_or_else(|| AppError::BadRequest("Missing required field: snapshot_date".into()))?;

    let deleted_records = SnapshotRepo::delete_by_date(&state.pool, snapshot_date).await?;

    let now = Utc::now();
    SnapshotRepo::record_deletion(&state.pool, snapshot_date, deleted_records, &performed_by, now)
        .await?;

    tracing::warn!(
        %snapshot_date,
        deleted_records,
        performed_by = %performed_by,
        "Snapshot deleted"
    );

    Ok(Json(DeleteSnapshotResponse {
        success: true,
        snapshot_date,
        deleted_records,
        message: format!("Deleted {deleted_records} snapshot rows for {snapshot_date}"),
        performed_by: Some(performed_by),
    }))
}

/// Resolve the caller: the operator token, or an admin session token.
///
/// Returns who performed the action for the audit trail.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<String, AppError> {
    if operator_token_matches(headers, &state.config.secret_token) {
        return Ok("operator-token".to_string());
    }

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header or operator token".into(),
            ))
        })?;

    let claims = verify_session_token(token, &state.config.jwt)
        .map_err(|_| AppError::Core(CoreError::Unauthorized("Invalid or expired token".into())))?;

    if !roles::is_admin(&claims.access_level) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Admin access required to delete snapshots".into(),
        )));
    }

    Ok(claims.discord_id)
}
