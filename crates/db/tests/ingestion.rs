//! Integration tests for the ingestion repositories against a real
//! database:
//! - wholesale cache replace and freshness marker
//! - snapshot upsert idempotence on `(snapshot_date, player_id)`
//! - controller-state seeding and targeted updates
//! - email audit log inserts

use chrono::{NaiveDate, TimeZone, Utc};
use sqlx::PgPool;

use eggboard_db::models::cache::CacheEntry;
use eggboard_db::models::email_log::NewEmailLog;
use eggboard_db::models::snapshot::{NewEggdayGain, NewPlayerSnapshot};
use eggboard_db::repositories::{
    CacheRepo, ControllerStateRepo, ControllerStateUpdate, EmailLogRepo, ExcludedPlayerRepo,
    SnapshotRepo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn cache_entry(player_id: &str, eb: f64) -> CacheEntry {
    CacheEntry {
        player_id: player_id.to_string(),
        ign: format!("ign-{player_id}"),
        display_name: None,
        discord_name: format!("discord-{player_id}"),
        eb,
        se: 1.0e12,
        pe: 250,
        te: Some(5),
        num_prestiges: Some(30),
        farmer_role: Some("farmer".to_string()),
        grade: "AAA".to_string(),
        is_guest: false,
        active: true,
    }
}

fn snapshot_row(date: NaiveDate, player_id: &str, eb: f64) -> NewPlayerSnapshot {
    NewPlayerSnapshot {
        snapshot_date: date,
        player_id: player_id.to_string(),
        ign: format!("ign-{player_id}"),
        display_name: Some(format!("Display {player_id}")),
        discord_name: format!("discord-{player_id}"),
        farmer_role: None,
        grade: "AA".to_string(),
        active: true,
        is_guest: false,
        eb,
        se: 2.0e13,
        pe: 100,
        te: None,
        num_prestiges: Some(12),
        updated_at: Some(Utc.with_ymd_and_hms(2025, 6, 7, 11, 0, 0).unwrap()),
        gains_saturday: Some(1.5e11),
        max_mystical_eggs: Some(3),
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn cache_replace_overwrites_previous_poll(pool: PgPool) {
    let now = Utc.with_ymd_and_hms(2025, 6, 7, 12, 0, 0).unwrap();

    let first = vec![cache_entry("a", 10.0), cache_entry("b", 20.0)];
    let inserted = CacheRepo::replace_all(&pool, &first).await.unwrap();
    assert_eq!(inserted, 2);
    CacheRepo::touch_freshness(&pool, now).await.unwrap();

    // Second poll drops player b and adds c; the cache must be an exact
    // image of the latest poll.
    let second = vec![cache_entry("a", 11.0), cache_entry("c", 30.0)];
    CacheRepo::replace_all(&pool, &second).await.unwrap();
    let later = now + chrono::Duration::minutes(15);
    CacheRepo::touch_freshness(&pool, later).await.unwrap();

    let all = CacheRepo::list_all(&pool).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|e| e.player_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a"]); // ordered by eb DESC

    let freshness = CacheRepo::freshness(&pool).await.unwrap().unwrap();
    assert_eq!(freshness.last_updated, later);

    assert!(CacheRepo::find_by_player(&pool, "b").await.unwrap().is_none());
    let a = CacheRepo::find_by_player(&pool, "a").await.unwrap().unwrap();
    assert_eq!(a.eb, 11.0);
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn snapshot_upsert_is_idempotent_per_date_and_player(pool: PgPool) {
    let date = NaiveDate::from_ymd_opt(2025, 6, 7).unwrap();
    let rows = vec![snapshot_row(date, "a", 10.0), snapshot_row(date, "b", 20.0)];

    SnapshotRepo::upsert_snapshot_batch(&pool, &rows).await.unwrap();
    assert_eq!(SnapshotRepo::count_for_date(&pool, date).await.unwrap(), 2);

    // Upserting the same set again changes nothing but the values.
    let mut updated = rows.clone();
    updated[0].eb = 15.0;
    SnapshotRepo::upsert_snapshot_batch(&pool, &updated).await.unwrap();
    assert_eq!(SnapshotRepo::count_for_date(&pool, date).await.unwrap(), 2);

    let imported_at = Utc.with_ymd_and_hms(2025, 6, 7, 12, 5, 0).unwrap();
    SnapshotRepo::upsert_metadata(&pool, date, 2, imported_at).await.unwrap();
    let meta = SnapshotRepo::metadata_for_date(&pool, date).await.unwrap().unwrap();
    assert_eq!(meta.record_count, 2);
    assert_eq!(meta.imported_at, imported_at);
}

#[sqlx::test(migrations = "./migrations")]
async fn eggday_gains_upsert_on_player_year(pool: PgPool) {
    let gain = NewEggdayGain {
        player_id: "a".to_string(),
        year: 2024,
        start_se: 1.0,
        start_pe: 10,
        start_eb: 100.0,
        start_role: Some("farmer".to_string()),
        start_prestiges: Some(5),
        end_se: 2.0,
        end_pe: 20,
        end_eb: 200.0,
        end_role: Some("farmer ii".to_string()),
        end_prestiges: Some(6),
    };

    SnapshotRepo::upsert_eggday_batch(&pool, &[gain.clone()]).await.unwrap();

    let mut revised = gain;
    revised.end_eb = 250.0;
    SnapshotRepo::upsert_eggday_batch(&pool, &[revised]).await.unwrap();

    let (count, end_eb): (i64, f64) = sqlx::query_as(
        "SELECT COUNT(*) OVER (), end_eb FROM eggday_gains WHERE player_id = 'a' AND year = 2024",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
    assert_eq!(end_eb, 250.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_by_date_removes_rows_and_metadata(pool: PgPool) {
    let date = NaiveDate::from_ymd_opt(2025, 6, 7).unwrap();
    let other = NaiveDate::from_ymd_opt(2025, 6, 8).unwrap();
    let rows = vec![
        snapshot_row(date, "a", 10.0),
        snapshot_row(date, "b", 20.0),
        snapshot_row(other, "a", 12.0),
    ];
    SnapshotRepo::upsert_snapshot_batch(&pool, &rows).await.unwrap();
    SnapshotRepo::upsert_metadata(&pool, date, 2, Utc::now()).await.unwrap();

    let deleted = SnapshotRepo::delete_by_date(&pool, date).await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(SnapshotRepo::count_for_date(&pool, date).await.unwrap(), 0);
    assert_eq!(SnapshotRepo::count_for_date(&pool, other).await.unwrap(), 1);
    assert!(SnapshotRepo::metadata_for_date(&pool, date).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn refresh_views_reports_status(pool: PgPool) {
    let date = NaiveDate::from_ymd_opt(2025, 6, 7).unwrap();
    SnapshotRepo::upsert_snapshot_batch(&pool, &[snapshot_row(date, "a", 10.0)])
        .await
        .unwrap();

    let status = SnapshotRepo::refresh_views(&pool).await.unwrap();
    assert!(status.contains("unique_players_latest"));

    let latest: (String,) =
        sqlx::query_as("SELECT player_id FROM unique_players_latest WHERE player_id = 'a'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(latest.0, "a");
}

// ---------------------------------------------------------------------------
// Controller state
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn controller_state_seed_and_targeted_updates(pool: PgPool) {
    let now = Utc.with_ymd_and_hms(2025, 6, 7, 12, 0, 0).unwrap();

    assert!(ControllerStateRepo::load(&pool).await.unwrap().is_none());

    ControllerStateRepo::upsert_initial(&pool, now).await.unwrap();
    let state = ControllerStateRepo::load(&pool).await.unwrap().unwrap();
    assert_eq!(state.id, 1);
    assert!(state.last_saved_at.is_none());
    assert_eq!(state.pending_attempt_count, 0);

    // Park a parcel, then save: the save must clear every pending field.
    let parcel = serde_json::json!({"attemptCount": 1, "syncPercentage": 99.0});
    let park = ControllerStateUpdate {
        pending: Some(parcel),
        pending_first_attempt: Some(now),
        pending_attempt_count: Some(1),
        ..Default::default()
    };
    ControllerStateRepo::update(&pool, &park).await.unwrap();
    let parked = ControllerStateRepo::load(&pool).await.unwrap().unwrap();
    assert!(parked.pending.is_some());
    assert_eq!(parked.pending_attempt_count, 1);
    assert_eq!(parked.pending_first_attempt, Some(now));

    let save_time = now + chrono::Duration::minutes(15);
    let mark_saved = ControllerStateUpdate {
        last_saved_at: Some(save_time),
        clear_pending: true,
        ..Default::default()
    };
    ControllerStateRepo::update(&pool, &mark_saved).await.unwrap();
    let saved = ControllerStateRepo::load(&pool).await.unwrap().unwrap();
    assert_eq!(saved.last_saved_at, Some(save_time));
    assert!(saved.pending.is_none());
    assert!(saved.pending_first_attempt.is_none());
    assert_eq!(saved.pending_attempt_count, 0);
    // The pre-write trigger bumps updated_at on every write.
    assert!(saved.updated_at >= parked.updated_at);

    let record_decision = ControllerStateUpdate {
        last_decision_at: Some(save_time),
        last_decision_result: Some(serde_json::json!({"shouldSave": true})),
        ..Default::default()
    };
    ControllerStateRepo::update(&pool, &record_decision).await.unwrap();
    let record_alert = ControllerStateUpdate {
        last_email_sent_at: Some(save_time),
        last_email_type: Some("week_no_update".to_string()),
        ..Default::default()
    };
    ControllerStateRepo::update(&pool, &record_alert).await.unwrap();
    let after = ControllerStateRepo::load(&pool).await.unwrap().unwrap();
    assert_eq!(after.last_decision_at, save_time);
    assert_eq!(after.last_email_type.as_deref(), Some("week_no_update"));
}

#[sqlx::test(migrations = "./migrations")]
async fn controller_state_update_leaves_unsupplied_fields_alone(pool: PgPool) {
    let now = Utc.with_ymd_and_hms(2025, 6, 7, 12, 0, 0).unwrap();

    ControllerStateRepo::upsert_initial(&pool, now).await.unwrap();
    // Seeding twice must not reset anything.
    ControllerStateRepo::upsert_initial(&pool, now + chrono::Duration::hours(1))
        .await
        .unwrap();
    let seeded = ControllerStateRepo::load(&pool).await.unwrap().unwrap();
    assert_eq!(seeded.last_decision_at, now);

    let park = ControllerStateUpdate {
        pending: Some(serde_json::json!({"attemptCount": 1})),
        pending_first_attempt: Some(now),
        pending_attempt_count: Some(1),
        ..Default::default()
    };
    ControllerStateRepo::update(&pool, &park).await.unwrap();

    // A decision-only update must not touch the parked parcel.
    let record_decision = ControllerStateUpdate {
        last_decision_at: Some(now + chrono::Duration::minutes(15)),
        last_decision_result: Some(serde_json::json!({"shouldSave": false})),
        ..Default::default()
    };
    ControllerStateRepo::update(&pool, &record_decision).await.unwrap();
    let state = ControllerStateRepo::load(&pool).await.unwrap().unwrap();
    assert!(state.pending.is_some());
    assert_eq!(state.pending_attempt_count, 1);

    // Clearing the parcel must not touch the email fields.
    let record_alert = ControllerStateUpdate {
        last_email_sent_at: Some(now),
        last_email_type: Some("week_no_update".to_string()),
        ..Default::default()
    };
    ControllerStateRepo::update(&pool, &record_alert).await.unwrap();
    let clear = ControllerStateUpdate {
        clear_pending: true,
        ..Default::default()
    };
    ControllerStateRepo::update(&pool, &clear).await.unwrap();
    let state = ControllerStateRepo::load(&pool).await.unwrap().unwrap();
    assert!(state.pending.is_none());
    assert_eq!(state.pending_attempt_count, 0);
    assert_eq!(state.last_email_type.as_deref(), Some("week_no_update"));

    // An empty update changes no field, but the pre-write trigger still
    // bumps updated_at.
    let before = ControllerStateRepo::load(&pool).await.unwrap().unwrap();
    ControllerStateRepo::update(&pool, &ControllerStateUpdate::default())
        .await
        .unwrap();
    let after = ControllerStateRepo::load(&pool).await.unwrap().unwrap();
    assert_eq!(after.last_email_type, before.last_email_type);
    assert_eq!(after.last_decision_at, before.last_decision_at);
    assert!(after.pending.is_none());
    assert!(after.updated_at >= before.updated_at);
}

// ---------------------------------------------------------------------------
// Exclusions and email log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn exclusion_registry_lists_ids(pool: PgPool) {
    sqlx::query(
        "INSERT INTO excluded_players (player_id, reason) VALUES \
         ('broken-1', 'clock drifts'), ('broken-2', 'stale account')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let entries = ExcludedPlayerRepo::list(&pool).await.unwrap();
    assert_eq!(entries.len(), 2);

    let ids = ExcludedPlayerRepo::list_ids(&pool).await.unwrap();
    assert!(ids.contains("broken-1"));
    assert!(ids.contains("broken-2"));
}

#[sqlx::test(migrations = "./migrations")]
async fn email_log_records_attempts(pool: PgPool) {
    let entry = NewEmailLog {
        sent_at: Utc.with_ymd_and_hms(2025, 6, 7, 12, 0, 0).unwrap(),
        kind: "snapshot_saved".to_string(),
        recipient: "ops@example.com".to_string(),
        subject: "Snapshot saved".to_string(),
        body_preview: Some("Saved 100 players".to_string()),
        success: true,
        error_message: None,
        response_data: Some(serde_json::json!({"id": "msg-1"})),
        related_snapshot_date: NaiveDate::from_ymd_opt(2025, 6, 7),
        metadata: None,
    };

    EmailLogRepo::insert(&pool, &entry).await.unwrap();

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM email_log WHERE kind = 'snapshot_saved'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
}
