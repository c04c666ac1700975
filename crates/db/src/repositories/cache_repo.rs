//! Repository for `leaderboard_cache` and its freshness marker.

use sqlx::PgPool;

use eggboard_core::types::Timestamp;

use crate::models::cache::{CacheEntry, CacheFreshness};

/// Insert batch size for the wholesale cache replace.
const BATCH_SIZE: usize = 100;

/// Column list for `leaderboard_cache` queries.
const COLUMNS: &str = "\
    player_id, ign, display_name, discord_name, eb, se, pe, te, \
    num_prestiges, farmer_role, grade, is_guest, active";

/// Number of bound parameters per cache row.
const PARAMS_PER_ROW: usize = 13;

pub struct CacheRepo;

impl CacheRepo {
    /// Replace the entire cache with the given entries.
    ///
    /// Deletes every existing row, then inserts the new set in batches.
    /// The sequence is deliberately not transactional: a mid-way failure
    /// leaves a partial cache that the next poll overwrites. Callers must
    /// treat the freshness marker as a staleness hint only.
    pub async fn replace_all(pool: &PgPool, entries: &[CacheEntry]) -> Result<usize, sqlx::Error> {
        sqlx::query("DELETE FROM leaderboard_cache")
            .execute(pool)
            .await?;

        let mut inserted = 0usize;
        for chunk in entries.chunks(BATCH_SIZE) {
            inserted += Self::insert_batch(pool, chunk).await?;
        }
        Ok(inserted)
    }

    /// Insert one batch of cache rows with a single multi-row INSERT.
    async fn insert_batch(pool: &PgPool, entries: &[CacheEntry]) -> Result<usize, sqlx::Error> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut query = format!("INSERT INTO leaderboard_cache ({COLUMNS}) VALUES ");
        let mut param_idx = 1u32;
        let mut first = true;

        for _ in entries {
            if !first {
                query.push_str(", ");
            }
            first = false;
            query.push('(');
            for i in 0..PARAMS_PER_ROW {
                if i > 0 {
                    query.push_str(", ");
                }
                query.push_str(&format!("${param_idx}"));
                param_idx += 1;
            }
            query.push(')');
        }

        let mut q = sqlx::query(&query);
        for entry in entries {
            q = q
                .bind(&entry.player_id)
                .bind(&entry.ign)
                .bind(&entry.display_name)
                .bind(&entry.discord_name)
                .bind(entry.eb)
                .bind(entry.se)
                .bind(entry.pe)
                .bind(entry.te)
                .bind(entry.num_prestiges)
                .bind(&entry.farmer_role)
                .bind(&entry.grade)
                .bind(entry.is_guest)
                .bind(entry.active);
        }

        let result = q.execute(pool).await?;
        Ok(result.rows_affected() as usize)
    }

    /// Fetch the full cache ordered by earnings bonus descending.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<CacheEntry>, sqlx::Error> {
        sqlx::query_as::<_, CacheEntry>(&format!(
            "SELECT {COLUMNS} FROM leaderboard_cache ORDER BY eb DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Fetch a single player's cache row.
    pub async fn find_by_player(
        pool: &PgPool,
        player_id: &str,
    ) -> Result<Option<CacheEntry>, sqlx::Error> {
        sqlx::query_as::<_, CacheEntry>(&format!(
            "SELECT {COLUMNS} FROM leaderboard_cache WHERE player_id = $1"
        ))
        .bind(player_id)
        .fetch_optional(pool)
        .await
    }

    /// Read the freshness marker, if the cache was ever written.
    pub async fn freshness(pool: &PgPool) -> Result<Option<CacheFreshness>, sqlx::Error> {
        sqlx::query_as::<_, CacheFreshness>(
            "SELECT id, last_updated FROM leaderboard_cache_metadata WHERE id = 1",
        )
        .fetch_optional(pool)
        .await
    }

    /// Advance the freshness marker to `now`.
    pub async fn touch_freshness(pool: &PgPool, now: Timestamp) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO leaderboard_cache_metadata (id, last_updated) VALUES (1, $1) \
             ON CONFLICT (id) DO UPDATE SET last_updated = EXCLUDED.last_updated",
        )
        .bind(now)
        .execute(pool)
        .await?;
        Ok(())
    }
}
