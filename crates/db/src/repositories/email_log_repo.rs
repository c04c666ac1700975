//! Repository for the `email_log` audit table.
//!
//! The audit table is the authoritative record of notification attempts;
//! it is never read back by the controller's decision path.

use sqlx::PgPool;

use crate::models::email_log::NewEmailLog;

pub struct EmailLogRepo;

impl EmailLogRepo {
    /// Insert one audit row for a send attempt.
    pub async fn insert(pool: &PgPool, entry: &NewEmailLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO email_log \
             (sent_at, kind, recipient, subject, body_preview, success, \
              error_message, response_data, related_snapshot_date, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(entry.sent_at)
        .bind(&entry.kind)
        .bind(&entry.recipient)
        .bind(&entry.subject)
        .bind(&entry.body_preview)
        .bind(entry.success)
        .bind(&entry.error_message)
        .bind(&entry.response_data)
        .bind(entry.related_snapshot_date)
        .bind(&entry.metadata)
        .execute(pool)
        .await?;
        Ok(())
    }
}
