//! Weekly leaderboard: batch procedure client and read model.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use lingo_xp_core::{BatchRequest, BatchResult, LeaderboardProcedure, WeeklyLeaderboardEntry};
use sqlx::PgPool;

/// Calls `leaderboard_weekly_process_batch` in its own short transaction.
#[derive(Debug, Clone)]
pub struct PgLeaderboardProcedure {
    pool: PgPool,
}

impl PgLeaderboardProcedure {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaderboardProcedure for PgLeaderboardProcedure {
    async fn execute(&self, request: &BatchRequest) -> Result<BatchResult> {
        let mut tx = self.pool.begin().await?;

        // Server-side timeouts must be in place before the procedure's first statement.
        sqlx::query(
            "SELECT set_config('statement_timeout', $1, true), set_config('lock_timeout', $2, true)",
        )
        .bind(request.statement_timeout_ms.to_string())
        .bind(request.lock_timeout_ms.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to apply leaderboard batch timeouts")?;

        let result = sqlx::query_as::<_, BatchResult>(
            r"
            SELECT processed, from_id, to_id, new_last_event_id,
                   batch_count, new_event_count, groups_count, applied_xp
            FROM leaderboard_weekly_process_batch($1, $2, $3, $4)
            ",
        )
        .bind(&request.worker_name)
        .bind(request.batch_size)
        .bind(i64::try_from(request.statement_timeout_ms)?)
        .bind(i64::try_from(request.lock_timeout_ms)?)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("Leaderboard batch failed for worker {}", request.worker_name))?;

        tx.commit().await?;
        Ok(result)
    }
}

/// Read access to the weekly leaderboard projection.
#[derive(Debug, Clone)]
pub struct PgLeaderboardRepository {
    pool: PgPool,
}

impl PgLeaderboardRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Top entries of one week, highest XP first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn top_for_week(
        &self,
        week_start: NaiveDate,
        limit: i64,
    ) -> Result<Vec<WeeklyLeaderboardEntry>> {
        let entries = sqlx::query_as::<_, WeeklyLeaderboardEntry>(
            r"
            SELECT telegram_id, week_start, xp
            FROM weekly_leaderboard
            WHERE week_start = $1
            ORDER BY xp DESC, telegram_id ASC
            LIMIT $2
            ",
        )
        .bind(week_start)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Last XP event id folded by `worker_name`, if the worker ever ran.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn watermark(&self, worker_name: &str) -> Result<Option<i64>> {
        let watermark = sqlx::query_scalar(
            "SELECT last_event_id FROM leaderboard_worker_watermarks WHERE worker_name = $1",
        )
        .bind(worker_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(watermark)
    }

    /// Highest XP event id currently visible.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn latest_event_id(&self) -> Result<i64> {
        let latest: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM xp_events")
            .fetch_one(&self.pool)
            .await?;

        Ok(latest)
    }
}
