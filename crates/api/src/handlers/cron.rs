//! Handler for the scheduler entry point
//! (`POST /functions/v1/refresh-leaderboard-cron`).

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::controller::{self, TickContext, TickReport};
use crate::error::AppResult;
use crate::middleware::auth::Principal;
use crate::state::AppState;

/// POST /functions/v1/refresh-leaderboard-cron
///
/// Execute one controller tick. Any valid session token is accepted; the
/// external scheduler holds one minted with the shared secret. An aborted
/// tick (upstream unavailable) still answers 200 with `success: false` so
/// the scheduler does not retry-storm.
pub async fn refresh_leaderboard_cron(
    _principal: Principal,
    State(state): State<AppState>,
) -> AppResult<Json<TickReport>> {
    let report = controller::run_tick(&TickContext::from(&state), Utc::now()).await;
    Ok(Json(report))
}
