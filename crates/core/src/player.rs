//! Upstream player domain model.
//!
//! [`PlayerRecord`] is the in-memory shape of one player as reported by the
//! upstream provider for a single poll cycle. It lives only for that cycle:
//! the cache writer projects it into a cache entry and the snapshot writer
//! copies it into the dated history tables. The progression metrics (EB, SE,
//! PE, TE) are opaque to this service; they are stored and served, never
//! interpreted.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// One player as reported by the upstream for the current poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    /// Upstream player id (a Discord snowflake in practice).
    pub id: String,
    /// In-game name.
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
    /// The upstream's own "last time I refreshed this player" instant.
    /// `None` when the upstream sent an unparseable timestamp; such a
    /// record is kept for caching but excluded from sync-window math.
    pub updated_at: Option<Timestamp>,
    pub gains_saturday: Option<f64>,
    pub max_mystical_eggs: Option<i32>,
    /// Per-year progression deltas, ordered as received.
    #[serde(default)]
    pub egg_day: Vec<YearlyGain>,
}

/// Start/end progression metrics for one calendar year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearlyGain {
    pub year: i32,
    pub start: YearlyGainEdge,
    pub end: YearlyGainEdge,
}

/// One edge (start or end) of a yearly gain interval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearlyGainEdge {
    #[serde(rename = "SE")]
    pub se: f64,
    #[serde(rename = "PE")]
    pub pe: i64,
    #[serde(rename = "EB")]
    pub eb: f64,
    #[serde(rename = "Role")]
    pub role: Option<String>,
    #[serde(rename = "Prestiges")]
    pub prestiges: Option<i32>,
}
