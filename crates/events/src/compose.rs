//! Notification message composition.
//!
//! Each kind is composed into a subject plus HTML and plain-text bodies
//! from the tick's decision and write counts. The plain-text body also
//! feeds the audit log's 200-character preview.

use eggboard_core::decision::{Decision, MissingPlayer};
use eggboard_core::types::SnapshotDate;

/// Maximum characters of plain text kept in the audit preview.
pub const BODY_PREVIEW_CHARS: usize = 200;

/// The notification kinds. `SyncFailed` is reserved: declared in the audit
/// schema but never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    SnapshotSaved,
    PartialSync,
    WeekNoUpdate,
    SyncFailed,
}

impl EmailKind {
    /// The audit-table spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            EmailKind::SnapshotSaved => "snapshot_saved",
            EmailKind::PartialSync => "partial_sync",
            EmailKind::WeekNoUpdate => "week_no_update",
            EmailKind::SyncFailed => "sync_failed",
        }
    }
}

/// A composed message ready for delivery.
#[derive(Debug, Clone)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailContent {
    /// First [`BODY_PREVIEW_CHARS`] characters of the plain-text body.
    pub fn body_preview(&self) -> String {
        self.text.chars().take(BODY_PREVIEW_CHARS).collect()
    }
}

/// Context for the two save notifications.
#[derive(Debug, Clone)]
pub struct SaveEmailContext<'a> {
    pub decision: &'a Decision,
    pub snapshot_date: SnapshotDate,
    pub snapshot_rows_inserted: u64,
    pub snapshot_errors: u64,
    pub eggday_rows_inserted: u64,
    pub eggday_errors: u64,
    pub error_messages: &'a [String],
    pub refresh_result: &'a str,
}

/// Context for the outage alert.
#[derive(Debug, Clone)]
pub struct WeekNoUpdateContext {
    pub last_saved_at: Option<eggboard_core::types::Timestamp>,
    pub hours_since_last_save: f64,
}

/// Compose the clean-save notification.
pub fn snapshot_saved(ctx: &SaveEmailContext<'_>) -> EmailContent {
    let subject = format!(
        "Leaderboard snapshot saved for {} ({} players)",
        ctx.snapshot_date, ctx.decision.total_received
    );

    let mut text = format!(
        "A leaderboard snapshot was saved for {date}.\n\
         \n\
         Players received: {received}\n\
         Players excluded: {excluded}\n\
         Sync: {sync:.1}% ({in_window}/{denominator})\n\
         Snapshot rows written: {rows} ({row_errors} errors)\n\
         Yearly gain rows written: {gains} ({gain_errors} errors)\n\
         View refresh: {refresh}\n",
        date = ctx.snapshot_date,
        received = ctx.decision.total_received,
        excluded = ctx.decision.excluded_count,
        sync = ctx.decision.sync_percentage,
        in_window = ctx.decision.players_in_sync_window,
        denominator = ctx.decision.total_non_excluded,
        rows = ctx.snapshot_rows_inserted,
        row_errors = ctx.snapshot_errors,
        gains = ctx.eggday_rows_inserted,
        gain_errors = ctx.eggday_errors,
        refresh = ctx.refresh_result,
    );

    let mut html = format!(
        "<h2>Leaderboard snapshot saved</h2>\
         <p>A snapshot was saved for <strong>{date}</strong>.</p>\
         <ul>\
         <li>Players received: {received}</li>\
         <li>Players excluded: {excluded}</li>\
         <li>Sync: {sync:.1}% ({in_window}/{denominator})</li>\
         <li>Snapshot rows written: {rows} ({row_errors} errors)</li>\
         <li>Yearly gain rows written: {gains} ({gain_errors} errors)</li>\
         <li>View refresh: {refresh}</li>\
         </ul>",
        date = ctx.snapshot_date,
        received = ctx.decision.total_received,
        excluded = ctx.decision.excluded_count,
        sync = ctx.decision.sync_percentage,
        in_window = ctx.decision.players_in_sync_window,
        denominator = ctx.decision.total_non_excluded,
        rows = ctx.snapshot_rows_inserted,
        row_errors = ctx.snapshot_errors,
        gains = ctx.eggday_rows_inserted,
        gain_errors = ctx.eggday_errors,
        refresh = ctx.refresh_result,
    );

    if !ctx.error_messages.is_empty() {
        text.push_str("\nBatch write failures:\n");
        for message in ctx.error_messages {
            text.push_str("  - ");
            text.push_str(message);
            text.push('\n');
        }
        html.push_str("<h3>Batch write failures</h3><ul>");
        for message in ctx.error_messages {
            html.push_str(&format!("<li>{message}</li>"));
        }
        html.push_str("</ul>");
    }

    EmailContent {
        subject,
        html,
        text,
    }
}

/// Compose the degraded-save notification, listing the players that never
/// entered the sync window and any batch write failures.
pub fn partial_sync(ctx: &SaveEmailContext<'_>) -> EmailContent {
    let subject = format!(
        "Leaderboard snapshot saved with warnings for {} ({:.1}% sync)",
        ctx.snapshot_date, ctx.decision.sync_percentage
    );

    let mut text = format!(
        "A leaderboard snapshot was saved for {date} despite incomplete sync.\n\
         \n\
         Sync: {sync:.1}% ({in_window}/{denominator})\n\
         Retry attempts before saving: {attempts}\n\
         \n\
         Players outside the sync window:\n{missing}",
        date = ctx.snapshot_date,
        sync = ctx.decision.sync_percentage,
        in_window = ctx.decision.players_in_sync_window,
        denominator = ctx.decision.total_non_excluded,
        attempts = ctx.decision.pending_attempt_count,
        missing = missing_text(&ctx.decision.missing),
    );

    if !ctx.error_messages.is_empty() {
        text.push_str("\nBatch write failures:\n");
        for message in ctx.error_messages {
            text.push_str("  - ");
            text.push_str(message);
            text.push('\n');
        }
    }

    let mut html = format!(
        "<h2>Leaderboard snapshot saved with warnings</h2>\
         <p>A snapshot was saved for <strong>{date}</strong> despite incomplete sync \
         ({sync:.1}%, {in_window}/{denominator} after {attempts} attempts).</p>\
         <h3>Players outside the sync window</h3>{missing}",
        date = ctx.snapshot_date,
        sync = ctx.decision.sync_percentage,
        in_window = ctx.decision.players_in_sync_window,
        denominator = ctx.decision.total_non_excluded,
        attempts = ctx.decision.pending_attempt_count,
        missing = missing_html(&ctx.decision.missing),
    );

    if !ctx.error_messages.is_empty() {
        html.push_str("<h3>Batch write failures</h3><ul>");
        for message in ctx.error_messages {
            html.push_str(&format!("<li>{message}</li>"));
        }
        html.push_str("</ul>");
    }

    EmailContent {
        subject,
        html,
        text,
    }
}

/// Compose the outage alert.
pub fn week_no_update(ctx: &WeekNoUpdateContext) -> EmailContent {
    let days = (ctx.hours_since_last_save / 24.0).floor();
    let last_saved = ctx
        .last_saved_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());

    let subject = if ctx.last_saved_at.is_some() {
        format!("No leaderboard snapshot saved for {days:.0} days")
    } else {
        "No leaderboard snapshot has ever been saved".to_string()
    };

    let text = format!(
        "The snapshot controller has not committed a snapshot for over a week.\n\
         \n\
         Last successful save: {last_saved}\n\
         \n\
         Likely causes: the upstream population never reaching the sync \
         threshold, a persistently stale upstream, or excluded players \
         shrinking the denominator to zero.\n",
    );

    let html = format!(
        "<h2>No recent leaderboard snapshot</h2>\
         <p>The snapshot controller has not committed a snapshot for over a week.</p>\
         <p>Last successful save: <strong>{last_saved}</strong></p>\
         <p>Likely causes: the upstream population never reaching the sync \
         threshold, a persistently stale upstream, or excluded players \
         shrinking the denominator to zero.</p>",
    );

    EmailContent {
        subject,
        html,
        text,
    }
}

fn missing_text(missing: &[MissingPlayer]) -> String {
    if missing.is_empty() {
        return "  (none)\n".to_string();
    }
    missing
        .iter()
        .map(|m| match m.time_difference_hours {
            Some(h) => format!("  - {} ({:.2}h behind the window start)\n", m.ign, h),
            None => format!("  - {} (no parseable update time)\n", m.ign),
        })
        .collect()
}

fn missing_html(missing: &[MissingPlayer]) -> String {
    if missing.is_empty() {
        return "<p>(none)</p>".to_string();
    }
    let items: String = missing
        .iter()
        .map(|m| match m.time_difference_hours {
            Some(h) => format!("<li>{} ({h:.2}h behind the window start)</li>", m.ign),
            None => format!("<li>{} (no parseable update time)</li>", m.ign),
        })
        .collect();
    format!("<ul>{items}</ul>")
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use eggboard_core::decision::Decision;

    use super::*;

    fn decision() -> Decision {
        Decision {
            should_save: true,
            sync_percentage: 99.0,
            players_in_sync_window: 99,
            total_non_excluded: 100,
            total_received: 102,
            excluded_count: 2,
            lowest_updated_at: Some(Utc.with_ymd_and_hms(2025, 6, 7, 11, 0, 0).unwrap()),
            hours_since_lowest_update: 0.75,
            hours_since_last_save: 2.5,
            reason: "Partial sync after 2 attempts, saving with warning".to_string(),
            is_pending_sync: false,
            pending_attempt_count: 2,
            missing: vec![MissingPlayer {
                id: "laggard".to_string(),
                ign: "SlowHen".to_string(),
                updated_at: Some(Utc.with_ymd_and_hms(2025, 6, 7, 12, 15, 0).unwrap()),
                time_difference_hours: Some(1.25),
            }],
        }
    }

    fn context(decision: &Decision) -> SaveEmailContext<'_> {
        SaveEmailContext {
            decision,
            snapshot_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 7).unwrap(),
            snapshot_rows_inserted: 102,
            snapshot_errors: 0,
            eggday_rows_inserted: 51,
            eggday_errors: 0,
            error_messages: &[],
            refresh_result: "refreshed: unique_players_latest, weekly_statistics",
        }
    }

    #[test]
    fn snapshot_saved_mentions_date_and_counts() {
        let d = decision();
        let content = snapshot_saved(&context(&d));

        assert!(content.subject.contains("2025-06-07"));
        assert!(content.subject.contains("102 players"));
        assert!(content.text.contains("Players excluded: 2"));
        assert!(content.html.contains("<h2>Leaderboard snapshot saved</h2>"));
    }

    #[test]
    fn snapshot_saved_carries_batch_failures_when_present() {
        let d = decision();
        let errors = vec!["snapshot batch 0: deadlock detected".to_string()];
        let mut ctx = context(&d);
        ctx.error_messages = &errors;

        let content = snapshot_saved(&ctx);
        assert!(content.text.contains("deadlock detected"));
        assert!(content.html.contains("Batch write failures"));
    }

    #[test]
    fn partial_sync_lists_stragglers() {
        let d = decision();
        let content = partial_sync(&context(&d));

        assert!(content.subject.contains("99.0% sync"));
        assert!(content.text.contains("SlowHen"));
        assert!(content.text.contains("1.25h"));
        assert!(content.html.contains("<li>SlowHen"));
    }

    #[test]
    fn partial_sync_appends_batch_failures() {
        let d = decision();
        let errors = vec!["snapshot batch 2: connection reset".to_string()];
        let mut ctx = context(&d);
        ctx.error_messages = &errors;

        let content = partial_sync(&ctx);
        assert!(content.text.contains("connection reset"));
        assert!(content.html.contains("Batch write failures"));
    }

    #[test]
    fn week_no_update_reports_last_save() {
        let now = Utc.with_ymd_and_hms(2025, 6, 7, 12, 0, 0).unwrap();
        let content = week_no_update(&WeekNoUpdateContext {
            last_saved_at: Some(now - Duration::days(8)),
            hours_since_last_save: 192.0,
        });

        assert!(content.subject.contains("8 days"));
        assert!(content.text.contains("Last successful save"));

        let never = week_no_update(&WeekNoUpdateContext {
            last_saved_at: None,
            hours_since_last_save: f64::INFINITY,
        });
        assert!(never.subject.contains("ever"));
        assert!(never.text.contains("never"));
    }

    #[test]
    fn preview_truncates_to_200_chars() {
        let content = EmailContent {
            subject: "s".to_string(),
            html: String::new(),
            text: "x".repeat(500),
        };
        assert_eq!(content.body_preview().len(), BODY_PREVIEW_CHARS);
    }

    #[test]
    fn kind_spellings_match_the_audit_schema() {
        assert_eq!(EmailKind::SnapshotSaved.as_str(), "snapshot_saved");
        assert_eq!(EmailKind::PartialSync.as_str(), "partial_sync");
        assert_eq!(EmailKind::WeekNoUpdate.as_str(), "week_no_update");
        assert_eq!(EmailKind::SyncFailed.as_str(), "sync_failed");
    }
}
