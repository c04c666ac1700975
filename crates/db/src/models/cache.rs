//! Current-state cache models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use eggboard_core::types::Timestamp;

/// One row of `leaderboard_cache`: the cached subset of a player record.
///
/// The same shape is used for reads and for the wholesale replace, since
/// the cache has no generated columns.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub player_id: String,
    pub ign: String,
    pub display_name: Option<String>,
    pub discord_name: String,
    pub eb: f64,
    pub se: f64,
    pub pe: i64,
    pub te: Option<i64>,
    pub num_prestiges: Option<i32>,
    pub farmer_role: Option<String>,
    pub grade: String,
    pub is_guest: bool,
    pub active: bool,
}

/// The singleton freshness marker row (`leaderboard_cache_metadata`).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CacheFreshness {
    pub id: i32,
    pub last_updated: Timestamp,
}
