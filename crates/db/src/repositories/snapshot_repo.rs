//! Repository for the historical snapshot tables: `player_snapshots`,
//! `snapshot_metadata`, `eggday_gains`, and the derived-view refresh.

use sqlx::PgPool;

use eggboard_core::types::{SnapshotDate, Timestamp};

use crate::models::snapshot::{NewEggdayGain, NewPlayerSnapshot, SnapshotMetadataRow};

/// Insert columns for `player_snapshots` (excludes generated columns).
const SNAPSHOT_INSERT_COLUMNS: &str = "\
    snapshot_date, player_id, ign, display_name, discord_name, farmer_role, \
    grade, active, is_guest, eb, se, pe, te, num_prestiges, updated_at, \
    gains_saturday, max_mystical_eggs";

const SNAPSHOT_PARAMS_PER_ROW: usize = 17;

/// Insert columns for `eggday_gains`.
const EGGDAY_INSERT_COLUMNS: &str = "\
    player_id, year, start_se, start_pe, start_eb, start_role, start_prestiges, \
    end_se, end_pe, end_eb, end_role, end_prestiges";

const EGGDAY_PARAMS_PER_ROW: usize = 12;

pub struct SnapshotRepo;

impl SnapshotRepo {
    /// Upsert one batch of snapshot rows on `(snapshot_date, player_id)`.
    ///
    /// Returns the number of rows written. The caller chunks the full set
    /// and accounts for failures per batch.
    pub async fn upsert_snapshot_batch(
        pool: &PgPool,
        rows: &[NewPlayerSnapshot],
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut query = build_values_query(
            &format!("INSERT INTO player_snapshots ({SNAPSHOT_INSERT_COLUMNS}) VALUES "),
            rows.len(),
            SNAPSHOT_PARAMS_PER_ROW,
        );
        query.push_str(
            " ON CONFLICT (snapshot_date, player_id) DO UPDATE SET \
             ign = EXCLUDED.ign, display_name = EXCLUDED.display_name, \
             discord_name = EXCLUDED.discord_name, farmer_role = EXCLUDED.farmer_role, \
             grade = EXCLUDED.grade, active = EXCLUDED.active, \
             is_guest = EXCLUDED.is_guest, eb = EXCLUDED.eb, se = EXCLUDED.se, \
             pe = EXCLUDED.pe, te = EXCLUDED.te, \
             num_prestiges = EXCLUDED.num_prestiges, updated_at = EXCLUDED.updated_at, \
             gains_saturday = EXCLUDED.gains_saturday, \
             max_mystical_eggs = EXCLUDED.max_mystical_eggs",
        );

        let mut q = sqlx::query(&query);
        for row in rows {
            q = q
                .bind(row.snapshot_date)
                .bind(&row.player_id)
                .bind(&row.ign)
                .bind(&row.display_name)
                .bind(&row.discord_name)
                .bind(&row.farmer_role)
                .bind(&row.grade)
                .bind(row.active)
                .bind(row.is_guest)
                .bind(row.eb)
                .bind(row.se)
                .bind(row.pe)
                .bind(row.te)
                .bind(row.num_prestiges)
                .bind(row.updated_at)
                .bind(row.gains_saturday)
                .bind(row.max_mystical_eggs);
        }

        let result = q.execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Upsert one batch of yearly gain rows on `(player_id, year)`.
    pub async fn upsert_eggday_batch(
        pool: &PgPool,
        rows: &[NewEggdayGain],
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut query = build_values_query(
            &format!("INSERT INTO eggday_gains ({EGGDAY_INSERT_COLUMNS}) VALUES "),
            rows.len(),
            EGGDAY_PARAMS_PER_ROW,
        );
        query.push_str(
            " ON CONFLICT (player_id, year) DO UPDATE SET \
             start_se = EXCLUDED.start_se, start_pe = EXCLUDED.start_pe, \
             start_eb = EXCLUDED.start_eb, start_role = EXCLUDED.start_role, \
             start_prestiges = EXCLUDED.start_prestiges, end_se = EXCLUDED.end_se, \
             end_pe = EXCLUDED.end_pe, end_eb = EXCLUDED.end_eb, \
             end_role = EXCLUDED.end_role, end_prestiges = EXCLUDED.end_prestiges, \
             updated_at = now()",
        );

        let mut q = sqlx::query(&query);
        for row in rows {
            q = q
                .bind(&row.player_id)
                .bind(row.year)
                .bind(row.start_se)
                .bind(row.start_pe)
                .bind(row.start_eb)
                .bind(&row.start_role)
                .bind(row.start_prestiges)
                .bind(row.end_se)
                .bind(row.end_pe)
                .bind(row.end_eb)
                .bind(&row.end_role)
                .bind(row.end_prestiges);
        }

        let result = q.execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Upsert the per-date import bookkeeping row.
    pub async fn upsert_metadata(
        pool: &PgPool,
        snapshot_date: SnapshotDate,
        record_count: i32,
        imported_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO snapshot_metadata (snapshot_date, record_count, imported_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (snapshot_date) DO UPDATE SET \
             record_count = EXCLUDED.record_count, imported_at = EXCLUDED.imported_at",
        )
        .bind(snapshot_date)
        .bind(record_count)
        .bind(imported_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Fetch the import bookkeeping row for a date.
    pub async fn metadata_for_date(
        pool: &PgPool,
        snapshot_date: SnapshotDate,
    ) -> Result<Option<SnapshotMetadataRow>, sqlx::Error> {
        sqlx::query_as::<_, SnapshotMetadataRow>(
            "SELECT snapshot_date, record_count, imported_at \
             FROM snapshot_metadata WHERE snapshot_date = $1",
        )
        .bind(snapshot_date)
        .fetch_optional(pool)
        .await
    }

    /// Refresh the derived materialized views, returning the database's
    /// status string.
    pub async fn refresh_views(pool: &PgPool) -> Result<String, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT refresh_leaderboard_views()")
            .fetch_one(pool)
            .await
    }

    /// Delete every snapshot row for a date, plus its metadata row.
    /// Returns the number of player rows removed.
    pub async fn delete_by_date(
        pool: &PgPool,
        snapshot_date: SnapshotDate,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM player_snapshots WHERE snapshot_date = $1")
            .bind(snapshot_date)
            .execute(pool)
            .await?;

        sqlx::query("DELETE FROM snapshot_metadata WHERE snapshot_date = $1")
            .bind(snapshot_date)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Record an operator deletion in the audit trail.
    pub async fn record_deletion(
        pool: &PgPool,
        snapshot_date: SnapshotDate,
        deleted_records: u64,
        performed_by: &str,
        performed_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO snapshot_deletion_audit \
             (snapshot_date, deleted_records, performed_by, performed_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(snapshot_date)
        .bind(deleted_records as i64)
        .bind(performed_by)
        .bind(performed_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Count the snapshot rows stored for a date.
    pub async fn count_for_date(
        pool: &PgPool,
        snapshot_date: SnapshotDate,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM player_snapshots WHERE snapshot_date = $1",
        )
        .bind(snapshot_date)
        .fetch_one(pool)
        .await
    }
}

/// Build a multi-row `INSERT ... VALUES ($1, ...), (...)` prefix.
fn build_values_query(prefix: &str, row_count: usize, params_per_row: usize) -> String {
    let mut query = prefix.to_string();
    let mut param_idx = 1u32;
    let mut first = true;

    for _ in 0..row_count {
        if !first {
            query.push_str(", ");
        }
        first = false;
        query.push('(');
        for i in 0..params_per_row {
            if i > 0 {
                query.push_str(", ");
            }
            query.push_str(&format!("${param_idx}"));
            param_idx += 1;
        }
        query.push(')');
    }

    query
}
