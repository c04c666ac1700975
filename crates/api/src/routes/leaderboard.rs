//! Route definitions for the cache read endpoints.

use axum::routing::get;
use axum::Router;

use crate::handlers::leaderboard;
use crate::state::AppState;

/// Routes mounted under `/functions/v1`.
///
/// ```text
/// GET /get-leaderboard           -> full cache (bearer)
/// GET /get-player-current-stats  -> one row (bearer; admin for others)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get-leaderboard", get(leaderboard::get_leaderboard))
        .route(
            "/get-player-current-stats",
            get(leaderboard::get_player_current_stats),
        )
}
