//! Fire-and-forget notification dispatch with audit logging.

use chrono::Utc;

use eggboard_core::types::{SnapshotDate, Timestamp};
use eggboard_db::models::email_log::NewEmailLog;
use eggboard_db::repositories::EmailLogRepo;
use eggboard_db::DbPool;

use crate::compose::{self, EmailContent, EmailKind, SaveEmailContext, WeekNoUpdateContext};
use crate::mailer::Mailer;

/// Composes, sends, and audits operator notifications.
///
/// When no mailer is configured the dispatcher only logs; when a send
/// fails, the failure is recorded in `email_log` and swallowed. Nothing
/// here can fail the controller tick.
pub struct Notifier {
    pool: DbPool,
    mailer: Option<Mailer>,
}

impl Notifier {
    pub fn new(pool: DbPool, mailer: Option<Mailer>) -> Self {
        Self { pool, mailer }
    }

    /// Whether delivery is configured (used only for reporting).
    pub fn is_configured(&self) -> bool {
        self.mailer.is_some()
    }

    /// Send the clean-save notification.
    pub async fn snapshot_saved(&self, ctx: &SaveEmailContext<'_>) -> Result<(), String> {
        let content = compose::snapshot_saved(ctx);
        self.dispatch(EmailKind::SnapshotSaved, content, Some(ctx.snapshot_date), None)
            .await
    }

    /// Send the degraded-save notification.
    pub async fn partial_sync(&self, ctx: &SaveEmailContext<'_>) -> Result<(), String> {
        let content = compose::partial_sync(ctx);
        let metadata = serde_json::json!({
            "syncPercentage": ctx.decision.sync_percentage,
            "missingCount": ctx.decision.missing.len(),
            "attempts": ctx.decision.pending_attempt_count,
        });
        self.dispatch(
            EmailKind::PartialSync,
            content,
            Some(ctx.snapshot_date),
            Some(metadata),
        )
        .await
    }

    /// Send the outage alert.
    pub async fn week_no_update(&self, ctx: &WeekNoUpdateContext) -> Result<(), String> {
        let content = compose::week_no_update(ctx);
        let metadata = serde_json::json!({
            "lastSavedAt": ctx.last_saved_at,
        });
        self.dispatch(EmailKind::WeekNoUpdate, content, None, Some(metadata))
            .await
    }

    /// Deliver one composed message and write its audit row.
    ///
    /// The returned error is informational only (surfaced in operator
    /// responses); callers on the tick path ignore it.
    async fn dispatch(
        &self,
        kind: EmailKind,
        content: EmailContent,
        related_snapshot_date: Option<SnapshotDate>,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), String> {
        let Some(mailer) = &self.mailer else {
            tracing::info!(kind = kind.as_str(), subject = %content.subject,
                "Email delivery not configured, skipping send");
            return Err("email delivery not configured".to_string());
        };

        let sent_at: Timestamp = Utc::now();
        let (success, error_message, response_data) =
            match mailer.send(&content.subject, &content.html, &content.text).await {
                Ok(response) => {
                    tracing::info!(kind = kind.as_str(), subject = %content.subject, "Email sent");
                    (true, None, Some(response))
                }
                Err(e) => {
                    tracing::error!(kind = kind.as_str(), error = %e, "Email send failed");
                    (false, Some(e.to_string()), None)
                }
            };

        let body_preview = content.body_preview();
        let entry = NewEmailLog {
            sent_at,
            kind: kind.as_str().to_string(),
            recipient: mailer.recipient().to_string(),
            subject: content.subject,
            body_preview: Some(body_preview),
            success,
            error_message,
            response_data,
            related_snapshot_date,
            metadata,
        };

        // The audit row is best-effort too; losing it must not fail the tick.
        if let Err(e) = EmailLogRepo::insert(&self.pool, &entry).await {
            tracing::error!(error = %e, "Failed to write email audit row");
        }

        match entry.error_message {
            None => Ok(()),
            Some(message) => Err(message),
        }
    }
}
