//! Historical snapshot writer.
//!
//! Builds per-date snapshot rows and per-year gain rows from the poll's
//! records and upserts them in batches. A failed batch never aborts the
//! run: failures are counted and reported so the caller can decide what to
//! email. The save is not retried and not rolled back.

use serde::Serialize;

use eggboard_core::player::PlayerRecord;
use eggboard_core::types::{SnapshotDate, Timestamp};
use eggboard_db::models::snapshot::{NewEggdayGain, NewPlayerSnapshot};
use eggboard_db::repositories::SnapshotRepo;
use eggboard_db::DbPool;

/// Rows per upsert batch.
const BATCH_SIZE: usize = 100;

/// Aggregate result of one snapshot save.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSaveOutcome {
    pub snapshot_date: SnapshotDate,
    pub player_count: usize,
    pub snapshot_rows_inserted: u64,
    pub snapshot_errors: u64,
    pub eggday_rows_inserted: u64,
    pub eggday_errors: u64,
    /// Batch error messages, in batch order.
    pub error_messages: Vec<String>,
    /// Status string returned by the materialized-view refresh.
    pub refresh_result: String,
}

impl SnapshotSaveOutcome {
    /// Whether every row landed and the view refresh succeeded.
    pub fn is_clean(&self) -> bool {
        self.snapshot_errors == 0 && self.eggday_errors == 0 && self.error_messages.is_empty()
    }
}

/// Build the dated snapshot rows for one save.
pub fn build_snapshot_rows(
    records: &[PlayerRecord],
    snapshot_date: SnapshotDate,
) -> Vec<NewPlayerSnapshot> {
    records
        .iter()
        .map(|r| NewPlayerSnapshot {
            snapshot_date,
            player_id: r.id.clone(),
            ign: r.ign.clone(),
            display_name: r.display_name.clone(),
            discord_name: r.discord_name.clone(),
            farmer_role: r.farmer_role.clone(),
            grade: r.grade.clone(),
            active: r.active,
            is_guest: r.is_guest,
            eb: r.eb,
            se: r.se,
            pe: r.pe,
            te: r.te,
            num_prestiges: r.num_prestiges,
            updated_at: r.updated_at,
            gains_saturday: r.gains_saturday,
            max_mystical_eggs: r.max_mystical_eggs,
        })
        .collect()
}

/// Build one gain row per `(player, year)` found in the poll.
pub fn build_eggday_rows(records: &[PlayerRecord]) -> Vec<NewEggdayGain> {
    records
        .iter()
        .flat_map(|r| {
            r.egg_day.iter().map(|gain| NewEggdayGain {
                player_id: r.id.clone(),
                year: gain.year,
                start_se: gain.start.se,
                start_pe: gain.start.pe,
                start_eb: gain.start.eb,
                start_role: gain.start.role.clone(),
                start_prestiges: gain.start.prestiges,
                end_se: gain.end.se,
                end_pe: gain.end.pe,
                end_eb: gain.end.eb,
                end_role: gain.end.role.clone(),
                end_prestiges: gain.end.prestiges,
            })
        })
        .collect()
}

/// Save one snapshot: batched upserts, metadata bookkeeping, then the
/// materialized-view refresh.
pub async fn save_snapshot(
    pool: &DbPool,
    records: &[PlayerRecord],
    snapshot_date: SnapshotDate,
    now: Timestamp,
) -> SnapshotSaveOutcome {
    let snapshot_rows = build_snapshot_rows(records, snapshot_date);
    let eggday_rows = build_eggday_rows(records);

    let mut outcome = SnapshotSaveOutcome {
        snapshot_date,
        player_count: records.len(),
        snapshot_rows_inserted: 0,
        snapshot_errors: 0,
        eggday_rows_inserted: 0,
        eggday_errors: 0,
        error_messages: Vec::new(),
        refresh_result: String::new(),
    };

    for (index, chunk) in snapshot_rows.chunks(BATCH_SIZE).enumerate() {
        match SnapshotRepo::upsert_snapshot_batch(pool, chunk).await {
            Ok(written) => outcome.snapshot_rows_inserted += written,
            Err(e) => {
                outcome.snapshot_errors += chunk.len() as u64;
                outcome
                    .error_messages
                    .push(format!("snapshot batch {index}: {e}"));
            }
        }
    }

    for (index, chunk) in eggday_rows.chunks(BATCH_SIZE).enumerate() {
        match SnapshotRepo::upsert_eggday_batch(pool, chunk).await {
            Ok(written) => outcome.eggday_rows_inserted += written,
            Err(e) => {
                outcome.eggday_errors += chunk.len() as u64;
                outcome
                    .error_messages
                    .push(format!("eggday batch {index}: {e}"));
            }
        }
    }

    if let Err(e) =
        SnapshotRepo::upsert_metadata(pool, snapshot_date, records.len() as i32, now).await
    {
        outcome
            .error_messages
            .push(format!("snapshot metadata: {e}"));
    }

    outcome.refresh_result = match SnapshotRepo::refresh_views(pool).await {
        Ok(status) => status,
        Err(e) => format!("refresh failed: {e}"),
    };

    tracing::info!(
        snapshot_date = %outcome.snapshot_date,
        rows = outcome.snapshot_rows_inserted,
        errors = outcome.snapshot_errors,
        gains = outcome.eggday_rows_inserted,
        "Snapshot save finished"
    );

    outcome
}
