//! Read endpoints over the current-state cache
//! (`GET /functions/v1/get-leaderboard`,
//! `GET /functions/v1/get-player-current-stats`).
//!
//! Both endpoints enforce column masking locally: the cache tables carry
//! no row-level policies, so `numPrestiges` is nulled here for non-admin
//! callers before serialization.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use eggboard_core::error::CoreError;
use eggboard_core::types::Timestamp;
use eggboard_db::models::cache::CacheEntry;
use eggboard_db::repositories::CacheRepo;

use crate::error::{AppError, AppResult};
use crate::ingest::cache_writer;
use crate::middleware::auth::Principal;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Response body for `GET /get-leaderboard`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub players: Vec<CacheEntry>,
    pub last_updated: Option<Timestamp>,
    pub player_count: usize,
    pub from_cache: bool,
}

/// Query parameters for `GET /get-player-current-stats`.
#[derive(Debug, Deserialize)]
pub struct PlayerStatsQuery {
    pub discord_id: Option<String>,
}

/// Response body for `GET /get-player-current-stats`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatsResponse {
    pub player: CacheEntry,
    pub last_updated: Option<Timestamp>,
    pub from_cache: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /functions/v1/get-leaderboard
///
/// Returns the full cache. When the freshness marker is stale, one
/// upstream fetch is attempted first; if it fails, the stale cache is
/// served as-is.
pub async fn get_leaderboard(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<Json<LeaderboardResponse>> {
    let now = Utc::now();
    let mut from_cache = true;

    if !cache_is_fresh(&state, now).await? {
        match state.wonky.fetch().await {
            Ok(records) => {
                if let Err(e) = cache_writer::replace_cache(&state.pool, &records, now).await {
                    tracing::error!(error = %e, "Cache refresh write failed");
                } else {
                    from_cache = false;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stale cache refresh failed, serving cached data");
            }
        }
    }

    let mut players = CacheRepo::list_all(&state.pool).await?;
    if !principal.is_admin() {
        for player in &mut players {
            mask_entry(player);
        }
    }

    let last_updated = CacheRepo::freshness(&state.pool).await?.map(|f| f.last_updated);

    Ok(Json(LeaderboardResponse {
        player_count: players.len(),
        players,
        last_updated,
        from_cache,
    }))
}

/// GET /functions/v1/get-player-current-stats
///
/// With no parameter, returns the caller's own cache row. Querying another
/// player requires admin access.
pub async fn get_player_current_stats(
    principal: Principal,
    State(state): State<AppState>,
    Query(query): Query<PlayerStatsQuery>,
) -> AppResult<Json<PlayerStatsResponse>> {
    let target_id = match query.discord_id {
        Some(id) if principal.is_admin() => id,
        Some(_) => {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin access required to view another player's stats".into(),
            )))
        }
        None => principal.subject_id.clone(),
    };

    let mut player = CacheRepo::find_by_player(&state.pool, &target_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "player",
                id: target_id,
            })
        })?;

    if !principal.is_admin() {
        mask_entry(&mut player);
    }

    let last_updated = CacheRepo::freshness(&state.pool).await?.map(|f| f.last_updated);

    Ok(Json(PlayerStatsResponse {
        player,
        last_updated,
        from_cache: true,
    }))
}

/// Whether the freshness marker is inside the cache duration.
async fn cache_is_fresh(state: &AppState, now: Timestamp) -> Result<bool, AppError> {
    let Some(freshness) = CacheRepo::freshness(&state.pool).await? else {
        return Ok(false);
    };
    let age_minutes = (now - freshness.last_updated).num_minutes();
    Ok(age_minutes < state.config.cache_duration_minutes)
}

/// Null the admin-only columns on one cache entry.
fn mask_entry(entry: &mut CacheEntry) {
    entry.num_prestiges = None;
}
