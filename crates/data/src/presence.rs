//! Presence lookups backed by the `user_presence` heartbeat table.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use lingo_xp_core::{PresenceCache, PresenceConfig};
use sqlx::PgPool;

/// A user is present while their last heartbeat is younger than `ttl`.
#[derive(Debug, Clone)]
pub struct PgPresenceCache {
    pool: PgPool,
    ttl: Duration,
}

impl PgPresenceCache {
    #[must_use]
    pub fn new(pool: PgPool, config: &PresenceConfig) -> Self {
        Self {
            pool,
            ttl: config.ttl(),
        }
    }

    /// Records a heartbeat for `telegram_id`.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn touch(&self, telegram_id: i64) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO user_presence (telegram_id, last_seen_at)
            VALUES ($1, now())
            ON CONFLICT (telegram_id) DO UPDATE SET last_seen_at = EXCLUDED.last_seen_at
            ",
        )
        .bind(telegram_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PresenceCache for PgPresenceCache {
    async fn exists(&self, telegram_id: i64) -> Result<bool> {
        let present: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM user_presence
                WHERE telegram_id = $1
                  AND last_seen_at > now() - make_interval(secs => $2)
            )
            ",
        )
        .bind(telegram_id)
        .bind(self.ttl.as_secs_f64())
        .fetch_one(&self.pool)
        .await?;

        Ok(present)
    }
}
