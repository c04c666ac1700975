//! Repository for the `excluded_players` registry.
//!
//! The registry is mutated only out-of-band by operators; the controller
//! just reads it. Expected to stay single-digit sized.

use std::collections::HashSet;

use sqlx::PgPool;

use crate::models::exclusion::ExcludedPlayer;

pub struct ExcludedPlayerRepo;

impl ExcludedPlayerRepo {
    /// List all exclusion entries with their reasons.
    pub async fn list(pool: &PgPool) -> Result<Vec<ExcludedPlayer>, sqlx::Error> {
        sqlx::query_as::<_, ExcludedPlayer>(
            "SELECT player_id, reason, created_at FROM excluded_players ORDER BY created_at",
        )
        .fetch_all(pool)
        .await
    }

    /// The excluded player ids as a set, for the decision engine.
    pub async fn list_ids(pool: &PgPool) -> Result<HashSet<String>, sqlx::Error> {
        let ids: Vec<(String,)> = sqlx::query_as("SELECT player_id FROM excluded_players")
            .fetch_all(pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
