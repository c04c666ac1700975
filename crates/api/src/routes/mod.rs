//! Route definitions.
//!
//! The data and controller endpoints live under `/functions/v1`, matching
//! the paths the UI and the external scheduler already call.

pub mod auth;
pub mod controller;
pub mod health;
pub mod leaderboard;

use axum::Router;

use crate::state::AppState;

/// Build the `/functions/v1` route tree.
///
/// ```text
/// POST /discord-auth                  identity exchange (public)
/// POST /refresh-leaderboard-cron      one controller tick (bearer)
/// POST /update-player-data            external snapshot writer (operator)
/// POST /delete-snapshot               admin or operator
/// GET  /get-leaderboard               full cache (bearer)
/// GET  /get-player-current-stats      own or admin-queried row (bearer)
/// ```
pub fn functions_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(controller::router())
        .merge(leaderboard::router())
}
