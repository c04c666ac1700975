//! Route definitions for the controller and operator endpoints.

use axum::routing::post;
use axum::Router;

use crate::handlers::{cron, ingest, snapshot};
use crate::state::AppState;

/// Routes mounted under `/functions/v1`.
///
/// ```text
/// POST /refresh-leaderboard-cron -> one tick (any valid bearer)
/// POST /update-player-data       -> external writer (operator secret / internal)
/// POST /delete-snapshot          -> admin bearer or operator secret
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/refresh-leaderboard-cron",
            post(cron::refresh_leaderboard_cron),
        )
        .route("/update-player-data", post(ingest::update_player_data))
        .route("/delete-snapshot", post(snapshot::delete_snapshot))
}
