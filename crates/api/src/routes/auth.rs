//! Route definitions for the identity exchange.

use axum::routing::post;
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted under `/functions/v1`.
///
/// ```text
/// POST /discord-auth -> discord_auth (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/discord-auth", post(auth::discord_auth))
}
