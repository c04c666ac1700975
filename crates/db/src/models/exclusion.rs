//! Exclusion registry model.

use serde::Serialize;
use sqlx::FromRow;

use eggboard_core::types::Timestamp;

/// A row from `excluded_players`: a player whose upstream timestamps are
/// known-broken, with the operator's reason.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExcludedPlayer {
    pub player_id: String,
    pub reason: String,
    pub created_at: Timestamp,
}
