//! Notification audit log model.

use eggboard_core::types::{SnapshotDate, Timestamp};

/// Insert shape for `email_log`. One row is written per send attempt,
/// whether or not delivery succeeded.
#[derive(Debug, Clone)]
pub struct NewEmailLog {
    pub sent_at: Timestamp,
    pub kind: String,
    pub recipient: String,
    pub subject: String,
    /// First 200 characters of the plain-text body.
    pub body_preview: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub response_data: Option<serde_json::Value>,
    pub related_snapshot_date: Option<SnapshotDate>,
    pub metadata: Option<serde_json::Value>,
}
