//! Current-state cache writer.
//!
//! Projects the poll's records into cache entries and replaces the cache
//! wholesale. The freshness marker advances even when the replace fails
//! part-way: readers treat it as a staleness hint, never an integrity
//! guarantee, and the next poll self-heals.

use eggboard_core::player::PlayerRecord;
use eggboard_core::types::Timestamp;
use eggboard_db::models::cache::CacheEntry;
use eggboard_db::repositories::CacheRepo;
use eggboard_db::DbPool;

/// Project one upstream record into its cached subset.
///
/// The per-poll fields (`updated_at`, gains, mystical eggs) are dropped;
/// `grade` is canonicalized to uppercase at this layer.
pub fn project(record: &PlayerRecord) -> CacheEntry {
    CacheEntry {
        player_id: record.id.clone(),
        ign: record.ign.clone(),
        display_name: record.display_name.clone(),
        discord_name: record.discord_name.clone(),
        eb: record.eb,
        se: record.se,
        pe: record.pe,
        te: record.te,
        num_prestiges: record.num_prestiges,
        farmer_role: record.farmer_role.clone(),
        grade: record.grade.to_uppercase(),
        is_guest: record.is_guest,
        active: record.active,
    }
}

/// Replace the cache with this poll's records and advance the freshness
/// marker.
///
/// Returns the number of rows written. The marker is touched even if the
/// replace failed mid-way; the replace error is then surfaced to the
/// caller for reporting.
pub async fn replace_cache(
    pool: &DbPool,
    records: &[PlayerRecord],
    now: Timestamp,
) -> Result<usize, sqlx::Error> {
    let entries: Vec<CacheEntry> = records.iter().map(project).collect();

    let replace_result = CacheRepo::replace_all(pool, &entries).await;

    if let Err(e) = CacheRepo::touch_freshness(pool, now).await {
        tracing::error!(error = %e, "Failed to advance cache freshness marker");
    }

    replace_result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_drops_per_poll_fields_and_uppercases_grade() {
        let record = PlayerRecord {
            id: "1".to_string(),
            ign: "hen".to_string(),
            display_name: Some("Hen".to_string()),
            discord_name: "hen#0".to_string(),
            farmer_role: Some("farmer".to_string()),
            grade: "aaa".to_string(),
            active: true,
            is_guest: false,
            eb: 1.0,
            se: 2.0,
            pe: 3,
            te: Some(4),
            num_prestiges: Some(5),
            updated_at: Some(chrono::Utc::now()),
            gains_saturday: Some(9.9),
            max_mystical_eggs: Some(2),
            egg_day: Vec::new(),
        };

        let entry = project(&record);
        assert_eq!(entry.player_id, "1");
        assert_eq!(entry.grade, "AAA");
        assert_eq!(entry.num_prestiges, Some(5));
    }
}
