//! User and user-stats repositories.
//!
//! `user_stats` is only ever mutated through [`PgUserStatsRepository::sync`] and
//! the streak helpers; XP total and level are always recomputed from the ledger.

use async_trait::async_trait;
use lingo_xp_core::{
    ActionCounters, ProgressionError, UserRepository, UserStats, UserStatsRepository,
};
use tracing::debug;

use crate::database::PgTx;

const USER_STATS_COLUMNS: &str = "telegram_id, streak_days, longest_streak, last_streak_date, \
     words_learned, tasks_completed, mini_games_played, xp_total, level, last_active_at";

/// Repository for user existence checks.
#[derive(Debug, Clone, Default)]
pub struct PgUserRepository;

impl PgUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UserRepository<PgTx> for PgUserRepository {
    async fn exists_by_telegram_id(
        &self,
        tx: &mut PgTx,
        telegram_id: i64,
    ) -> Result<bool, ProgressionError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE telegram_id = $1)")
                .bind(telegram_id)
                .fetch_one(&mut **tx)
                .await?;
        Ok(exists)
    }
}

/// Repository for per-user rolling stats.
#[derive(Debug, Clone, Default)]
pub struct PgUserStatsRepository;

impl PgUserStatsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UserStatsRepository<PgTx> for PgUserStatsRepository {
    async fn exists_by_telegram_id(
        &self,
        tx: &mut PgTx,
        telegram_id: i64,
    ) -> Result<bool, ProgressionError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM user_stats WHERE telegram_id = $1)")
                .bind(telegram_id)
                .fetch_one(&mut **tx)
                .await?;
        Ok(exists)
    }

    async fn sync(
        &self,
        tx: &mut PgTx,
        telegram_id: i64,
        counters: &ActionCounters,
    ) -> Result<UserStats, ProgressionError> {
        let stats = sqlx::query_as::<_, UserStats>(&format!(
            r"
            WITH ledger AS (
                SELECT COALESCE(SUM(delta_xp), 0)::BIGINT AS xp
                FROM xp_events
                WHERE telegram_id = $1
            )
            UPDATE user_stats s
            SET words_learned = s.words_learned + $2,
                tasks_completed = s.tasks_completed + $3,
                mini_games_played = s.mini_games_played + $4,
                xp_total = ledger.xp,
                level = COALESCE(
                    (SELECT MAX(l.level_number) FROM levels l WHERE l.xp_required <= ledger.xp),
                    1
                ),
                last_active_at = now(),
                updated_at = now()
            FROM ledger
            WHERE s.telegram_id = $1
            RETURNING {USER_STATS_COLUMNS}
            "
        ))
        .bind(telegram_id)
        .bind(counters.words_learned)
        .bind(counters.tasks_completed)
        .bind(counters.mini_games_played)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(ProgressionError::UserStatsNotFound(telegram_id))?;

        debug!(
            telegram_id,
            xp_total = stats.xp_total,
            level = stats.level,
            "Synced user stats"
        );
        Ok(stats)
    }

    async fn has_streak_incremented_today(
        &self,
        tx: &mut PgTx,
        telegram_id: i64,
    ) -> Result<bool, ProgressionError> {
        let incremented: Option<bool> = sqlx::query_scalar(
            "SELECT last_streak_date IS NOT DISTINCT FROM CURRENT_DATE FROM user_stats WHERE telegram_id = $1",
        )
        .bind(telegram_id)
        .fetch_optional(&mut **tx)
        .await?;

        incremented.ok_or(ProgressionError::UserStatsNotFound(telegram_id))
    }

    async fn ensure_streak_increment_today(
        &self,
        tx: &mut PgTx,
        telegram_id: i64,
    ) -> Result<(), ProgressionError> {
        // Continue yesterday's streak, otherwise restart at 1; no-op when already done today.
        sqlx::query(
            r"
            UPDATE user_stats
            SET streak_days = CASE
                    WHEN last_streak_date = CURRENT_DATE - 1 THEN streak_days + 1
                    ELSE 1
                END,
                longest_streak = GREATEST(
                    longest_streak,
                    CASE WHEN last_streak_date = CURRENT_DATE - 1 THEN streak_days + 1 ELSE 1 END
                ),
                last_streak_date = CURRENT_DATE,
                updated_at = now()
            WHERE telegram_id = $1
              AND last_streak_date IS DISTINCT FROM CURRENT_DATE
            ",
        )
        .bind(telegram_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
