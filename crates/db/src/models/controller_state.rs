//! Controller state singleton model.

use sqlx::FromRow;

use eggboard_core::decision::{ControllerStateView, PendingParcel};
use eggboard_core::types::Timestamp;

/// The single `snapshot_save_metadata` row (id is always 1).
#[derive(Debug, Clone, FromRow)]
pub struct ControllerState {
    pub id: i32,
    pub last_saved_at: Option<Timestamp>,
    pub last_decision_at: Timestamp,
    pub last_decision_result: Option<serde_json::Value>,
    pub last_email_sent_at: Option<Timestamp>,
    pub last_email_type: Option<String>,
    pub pending: Option<serde_json::Value>,
    pub pending_first_attempt: Option<Timestamp>,
    pub pending_attempt_count: i32,
    pub pending_meta: Option<serde_json::Value>,
    pub updated_at: Timestamp,
}

impl ControllerState {
    /// Project the row into the decision engine's input view.
    ///
    /// A pending parcel that fails to deserialize (schema drift after a
    /// deploy) is treated as absent rather than failing the tick.
    pub fn to_view(&self) -> ControllerStateView {
        let pending: Option<PendingParcel> = self
            .pending
            .clone()
            .and_then(|v| serde_json::from_value(v).ok());

        ControllerStateView {
            last_saved_at: self.last_saved_at,
            last_email_sent_at: self.last_email_sent_at,
            last_email_type: self.last_email_type.clone(),
            pending,
            pending_first_attempt: self.pending_first_attempt,
            pending_attempt_count: self.pending_attempt_count,
        }
    }
}
