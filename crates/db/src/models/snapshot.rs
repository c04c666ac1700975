//! Historical snapshot models.

use serde::Serialize;
use sqlx::FromRow;

use eggboard_core::types::{SnapshotDate, Timestamp};

/// Insert shape for `player_snapshots` (excludes generated columns).
#[derive(Debug, Clone)]
pub struct NewPlayerSnapshot {
    pub snapshot_date: SnapshotDate,
    pub player_id: String,
    pub ign: String,
    pub display_name: Option<String>,
    pub discord_name: String,
    pub farmer_role: Option<String>,
    pub grade: String,
    pub active: bool,
    pub is_guest: bool,
    pub eb: f64,
    pub se: f64,
    pub pe: i64,
    pub te: Option<i64>,
    pub num_prestiges: Option<i32>,
    pub updated_at: Option<Timestamp>,
    pub gains_saturday: Option<f64>,
    pub max_mystical_eggs: Option<i32>,
}

/// A row from `snapshot_metadata`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SnapshotMetadataRow {
    pub snapshot_date: SnapshotDate,
    pub record_count: i32,
    pub imported_at: Timestamp,
}

/// Insert shape for `eggday_gains`, one per `(player, year)`.
#[derive(Debug, Clone)]
pub struct NewEggdayGain {
    pub player_id: String,
    pub year: i32,
    pub start_se: f64,
    pub start_pe: i64,
    pub start_eb: f64,
    pub start_role: Option<String>,
    pub start_prestiges: Option<i32>,
    pub end_se: f64,
    pub end_pe: i64,
    pub end_eb: f64,
    pub end_role: Option<String>,
    pub end_prestiges: Option<i32>,
}
