//! Repository for the controller state singleton (`snapshot_save_metadata`).
//!
//! The row is seeded on first use with [`ControllerStateRepo::upsert_initial`];
//! [`ControllerStateRepo::update`] performs a targeted merge, writing only
//! the fields supplied in a [`ControllerStateUpdate`] while a database
//! trigger bumps `updated_at` on every write. No concurrent writers are
//! expected, so last-write-wins is acceptable — the worst outcome is a
//! re-evaluation on the next tick.

use sqlx::PgPool;

use eggboard_core::types::Timestamp;

use crate::models::controller_state::ControllerState;

/// Column list for `snapshot_save_metadata` SELECT queries.
const COLUMNS: &str = "\
    id, last_saved_at, last_decision_at, last_decision_result, \
    last_email_sent_at, last_email_type, pending, pending_first_attempt, \
    pending_attempt_count, pending_meta, updated_at";

/// A targeted update of the singleton row. All fields are optional;
/// `None` means "leave unchanged".
///
/// Clearing the pending parcel is an explicit flag rather than a null
/// value: `clear_pending` nulls `pending`, `pending_first_attempt`, and
/// `pending_meta` and resets `pending_attempt_count` to 0. A pending
/// field supplied alongside the flag wins over the clear.
#[derive(Debug, Default)]
pub struct ControllerStateUpdate {
    pub last_saved_at: Option<Timestamp>,
    pub last_decision_at: Option<Timestamp>,
    pub last_decision_result: Option<serde_json::Value>,
    pub last_email_sent_at: Option<Timestamp>,
    pub last_email_type: Option<String>,
    pub pending: Option<serde_json::Value>,
    pub pending_first_attempt: Option<Timestamp>,
    pub pending_attempt_count: Option<i32>,
    pub pending_meta: Option<serde_json::Value>,
    /// Clear every pending field not explicitly supplied above.
    pub clear_pending: bool,
}

pub struct ControllerStateRepo;

impl ControllerStateRepo {
    /// Load the singleton row, or `None` on first use.
    pub async fn load(pool: &PgPool) -> Result<Option<ControllerState>, sqlx::Error> {
        sqlx::query_as::<_, ControllerState>(&format!(
            "SELECT {COLUMNS} FROM snapshot_save_metadata WHERE id = 1"
        ))
        .fetch_optional(pool)
        .await
    }

    /// Seed the singleton row if it does not exist. Idempotent: an
    /// existing row is left untouched.
    pub async fn upsert_initial(pool: &PgPool, now: Timestamp) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO snapshot_save_metadata (id, last_decision_at) VALUES (1, $1) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(now)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Merge the supplied fields into the singleton row.
    ///
    /// Unsupplied fields keep their current value; the pre-write trigger
    /// bumps `updated_at` on every call.
    pub async fn update(pool: &PgPool, update: &ControllerStateUpdate) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE snapshot_save_metadata SET \
                last_saved_at = COALESCE($1, last_saved_at), \
                last_decision_at = COALESCE($2, last_decision_at), \
                last_decision_result = COALESCE($3, last_decision_result), \
                last_email_sent_at = COALESCE($4, last_email_sent_at), \
                last_email_type = COALESCE($5, last_email_type), \
                pending = CASE \
                    WHEN $6 IS NOT NULL THEN $6 \
                    WHEN $10 THEN NULL \
                    ELSE pending END, \
                pending_first_attempt = CASE \
                    WHEN $7 IS NOT NULL THEN $7 \
                    WHEN $10 THEN NULL \
                    ELSE pending_first_attempt END, \
                pending_attempt_count = CASE \
                    WHEN $8 IS NOT NULL THEN $8 \
                    WHEN $10 THEN 0 \
                    ELSE pending_attempt_count END, \
                pending_meta = CASE \
                    WHEN $9 IS NOT NULL THEN $9 \
                    WHEN $10 THEN NULL \
                    ELSE pending_meta END \
             WHERE id = 1",
        )
        .bind(update.last_saved_at)
        .bind(update.last_decision_at)
        .bind(&update.last_decision_result)
        .bind(update.last_email_sent_at)
        .bind(&update.last_email_type)
        .bind(&update.pending)
        .bind(update.pending_first_attempt)
        .bind(update.pending_attempt_count)
        .bind(&update.pending_meta)
        .bind(update.clear_pending)
        .execute(pool)
        .await?;
        Ok(())
    }
}
