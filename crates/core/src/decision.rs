//! Snapshot decision engine.
//!
//! The upstream refreshes each player independently, so a dated snapshot is
//! only meaningful when the whole population was refreshed together. Given
//! one poll's records, the exclusion set, the persisted controller state,
//! and the current instant, [`decide`] classifies the poll as save / park /
//! skip. The function is pure: same inputs, same [`Decision`].
//!
//! A near-complete poll (at least [`DecisionConfig::partial_sync_threshold`]
//! percent of players inside the sync window) is parked as a pending parcel
//! and re-evaluated on the next tick; one retry bounds the wait for a few
//! straggler accounts to a single controller interval.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::player::PlayerRecord;
use crate::types::Timestamp;

/// Tunables for the decision engine. Defaults match production.
#[derive(Debug, Clone)]
pub struct DecisionConfig {
    /// How old the oldest `updated_at` may be for the poll to count as
    /// recent, in minutes. Slightly wider than the per-player window so a
    /// poll landing just after the upstream's own refresh pass still
    /// qualifies.
    pub sync_window_minutes: i64,
    /// Minimum hours since the last successful save before another is
    /// permitted.
    pub cooldown_hours: f64,
    /// Sync percentage at or above which a poll is parked for retry
    /// instead of discarded.
    pub partial_sync_threshold: f64,
    /// Total attempts (initial park + re-evaluations) before a partial
    /// poll is saved with a warning.
    pub partial_sync_retry_attempts: i32,
    /// Controller tick interval in minutes.
    pub cron_interval_minutes: i64,
    /// Hours after which an unresolved pending parcel is abandoned.
    pub pending_sync_stale_hours: f64,
    /// Days without a save before the outage alert fires.
    pub alert_threshold_days: i64,
    /// Minimum hours between consecutive outage alerts.
    pub alert_cooldown_hours: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            sync_window_minutes: 65,
            cooldown_hours: 1.5,
            partial_sync_threshold: 99.0,
            partial_sync_retry_attempts: 2,
            cron_interval_minutes: 15,
            pending_sync_stale_hours: 2.0,
            alert_threshold_days: 7,
            alert_cooldown_hours: 2.0,
        }
    }
}

/// Per-player window for the sync statistic. Strictly narrower than the
/// recency window; the one-hour boundary is exclusive.
const SYNC_STAT_WINDOW_SECS: i64 = 3600;

/// The slice of persisted controller state the engine reads.
#[derive(Debug, Clone, Default)]
pub struct ControllerStateView {
    pub last_saved_at: Option<Timestamp>,
    pub last_email_sent_at: Option<Timestamp>,
    pub last_email_type: Option<String>,
    pub pending: Option<PendingParcel>,
    pub pending_first_attempt: Option<Timestamp>,
    pub pending_attempt_count: i32,
}

/// A parked poll awaiting one more tick to either reach full sync or be
/// saved with a warning. Persisted as JSONB in the controller state row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingParcel {
    pub records: Vec<PlayerRecord>,
    pub captured_at: Timestamp,
    pub sync_percentage: f64,
    pub attempt_count: i32,
    pub missing: Vec<MissingPlayer>,
}

/// A player outside the sync window, annotated with how far behind the
/// window start its refresh was.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MissingPlayer {
    pub id: String,
    pub ign: String,
    pub updated_at: Option<Timestamp>,
    /// `(updated_at - lowest_updated_at)` in hours; `None` when the
    /// upstream timestamp was unparseable.
    pub time_difference_hours: Option<f64>,
}

/// Output of one engine evaluation.
///
/// Serialize-only: the non-finite hour fields become JSON null in the
/// persisted decision record.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub should_save: bool,
    pub sync_percentage: f64,
    pub players_in_sync_window: usize,
    pub total_non_excluded: usize,
    pub total_received: usize,
    pub excluded_count: usize,
    pub lowest_updated_at: Option<Timestamp>,
    /// Hours since the oldest `updated_at`; infinite when no record had a
    /// parseable timestamp (serializes as JSON null).
    pub hours_since_lowest_update: f64,
    /// Hours since the last successful save; infinite when never saved.
    pub hours_since_last_save: f64,
    pub reason: String,
    pub is_pending_sync: bool,
    pub pending_attempt_count: i32,
    pub missing: Vec<MissingPlayer>,
}

/// Evaluate one poll against the controller state.
///
/// Records flagged as guests and records in the exclusion set are dropped
/// before any statistic is computed; the remainder is the denominator of
/// the sync percentage.
pub fn decide(
    records: &[PlayerRecord],
    exclusions: &HashSet<String>,
    state: &ControllerStateView,
    now: Timestamp,
    config: &DecisionConfig,
) -> Decision {
    let total_received = records.len();
    let filtered: Vec<&PlayerRecord> = records
        .iter()
        .filter(|r| !r.is_guest && !exclusions.contains(&r.id))
        .collect();
    let total_non_excluded = filtered.len();
    let excluded_count = total_received - total_non_excluded;

    let hours_since_last_save = state
        .last_saved_at
        .map(|t| hours_between(t, now))
        .unwrap_or(f64::INFINITY);

    if total_non_excluded == 0 {
        return Decision {
            should_save: false,
            sync_percentage: 0.0,
            players_in_sync_window: 0,
            total_non_excluded,
            total_received,
            excluded_count,
            lowest_updated_at: None,
            hours_since_lowest_update: f64::INFINITY,
            hours_since_last_save,
            reason: "No valid players received from upstream".to_string(),
            is_pending_sync: false,
            pending_attempt_count: state.pending_attempt_count,
            missing: Vec::new(),
        };
    }

    let lowest_updated_at = filtered.iter().filter_map(|r| r.updated_at).min();

    let mut players_in_sync_window = 0usize;
    let mut missing: Vec<MissingPlayer> = Vec::new();
    for record in &filtered {
        let in_window = match (record.updated_at, lowest_updated_at) {
            (Some(updated), Some(lowest)) => {
                (updated - lowest).num_seconds() < SYNC_STAT_WINDOW_SECS
            }
            _ => false,
        };
        if in_window {
            players_in_sync_window += 1;
        } else {
            missing.push(MissingPlayer {
                id: record.id.clone(),
                ign: record.ign.clone(),
                updated_at: record.updated_at,
                time_difference_hours: match (record.updated_at, lowest_updated_at) {
                    (Some(updated), Some(lowest)) => Some(hours_between(lowest, updated)),
                    _ => None,
                },
            });
        }
    }

    let sync_percentage = 100.0 * players_in_sync_window as f64 / total_non_excluded as f64;

    let hours_since_lowest_update = lowest_updated_at
        .map(|t| hours_between(t, now))
        .unwrap_or(f64::INFINITY);
    let update_is_recent =
        hours_since_lowest_update < config.sync_window_minutes as f64 / 60.0;

    let cooldown_passed = hours_since_last_save > config.cooldown_hours;

    let base = Decision {
        should_save: false,
        sync_percentage,
        players_in_sync_window,
        total_non_excluded,
        total_received,
        excluded_count,
        lowest_updated_at,
        hours_since_lowest_update,
        hours_since_last_save,
        reason: String::new(),
        is_pending_sync: false,
        pending_attempt_count: 0,
        missing,
    };

    // A pending parcel that sat unresolved past the staleness bound is
    // ignored: the poll is evaluated as if nothing had been parked.
    let pending_is_live = state.pending.is_some()
        && state
            .pending_first_attempt
            .map(|t| hours_between(t, now) <= config.pending_sync_stale_hours)
            .unwrap_or(false);

    if pending_is_live {
        let attempts = state.pending_attempt_count + 1;
        if sync_percentage >= 100.0 {
            return Decision {
                should_save: true,
                reason: "100% sync achieved after pending sync".to_string(),
                pending_attempt_count: attempts,
                ..base
            };
        }
        if sync_percentage >= config.partial_sync_threshold {
            if state.pending_attempt_count >= config.partial_sync_retry_attempts - 1 {
                return Decision {
                    should_save: true,
                    reason: format!(
                        "Partial sync after {attempts} attempts, saving with warning"
                    ),
                    pending_attempt_count: attempts,
                    ..base
                };
            }
            // Only reachable when retry_attempts is raised above the
            // default of 2: keep waiting for the stragglers.
            return Decision {
                is_pending_sync: true,
                reason: "Partial sync detected, storing for retry".to_string(),
                pending_attempt_count: attempts,
                ..base
            };
        }
    }

    let fully_synced = sync_percentage >= 100.0;
    let partially_synced = sync_percentage >= config.partial_sync_threshold;

    if fully_synced && update_is_recent && cooldown_passed {
        return Decision {
            should_save: true,
            reason: "All conditions met".to_string(),
            ..base
        };
    }

    if partially_synced && update_is_recent && cooldown_passed && !pending_is_live {
        return Decision {
            is_pending_sync: true,
            reason: "Partial sync detected, storing for retry".to_string(),
            pending_attempt_count: 1,
            ..base
        };
    }

    let reason = if !update_is_recent {
        format!(
            "Update not recent enough ({hours_since_lowest_update:.2}h since oldest refresh)"
        )
    } else if !cooldown_passed {
        format!("Cooldown not passed ({hours_since_last_save:.2}h since last save)")
    } else {
        format!("Insufficient sync ({sync_percentage:.1}%)")
    };

    Decision { reason, ..base }
}

/// Whether the outage alert should be emitted this tick.
///
/// Fires when no snapshot has been saved for the alert threshold (plus one
/// hour of slack so a save at exactly the boundary does not alert), rate
/// limited by the alert cooldown.
pub fn should_send_week_no_update_alert(
    state: &ControllerStateView,
    now: Timestamp,
    config: &DecisionConfig,
) -> bool {
    let hours_since_last_save = state
        .last_saved_at
        .map(|t| hours_between(t, now))
        .unwrap_or(f64::INFINITY);

    if hours_since_last_save < (24 * config.alert_threshold_days + 1) as f64 {
        return false;
    }

    match state.last_email_sent_at {
        None => true,
        Some(sent) => hours_between(sent, now) > config.alert_cooldown_hours,
    }
}

/// Signed hours from `from` to `to`.
fn hours_between(from: Timestamp, to: Timestamp) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}
