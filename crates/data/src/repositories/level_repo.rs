//! Level history reconciliation.

use async_trait::async_trait;
use lingo_xp_core::{LevelProgress, LevelRepository, ProgressionError};
use tracing::{debug, info};

use crate::database::PgTx;

/// Repository keeping `level_history` in step with `user_stats.level`.
#[derive(Debug, Clone, Default)]
pub struct PgLevelRepository;

impl PgLevelRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LevelRepository<PgTx> for PgLevelRepository {
    async fn back_fill_missing_level_history(
        &self,
        tx: &mut PgTx,
        telegram_id: i64,
    ) -> Result<LevelProgress, ProgressionError> {
        let current_level: i32 =
            sqlx::query_scalar("SELECT level FROM user_stats WHERE telegram_id = $1")
                .bind(telegram_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(ProgressionError::UserStatsNotFound(telegram_id))?;

        // Level 1 is the baseline every user starts from.
        let old_level: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(level_number), 1) FROM level_history WHERE telegram_id = $1",
        )
        .bind(telegram_id)
        .fetch_one(&mut **tx)
        .await?;

        let inserted = sqlx::query(
            r"
            INSERT INTO level_history (telegram_id, level_number, xp_at_reach, xp_event_id, reached_at)
            SELECT $1,
                   l.level_number,
                   l.xp_required,
                   (SELECT MAX(e.id) FROM xp_events e WHERE e.telegram_id = $1),
                   now()
            FROM levels l
            WHERE l.level_number <= $2
            ON CONFLICT (telegram_id, level_number) DO NOTHING
            ",
        )
        .bind(telegram_id)
        .bind(current_level)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        let progress = LevelProgress {
            is_level_up: current_level > old_level,
            old_level,
            new_level: current_level.max(old_level),
        };

        if progress.is_level_up {
            info!(
                telegram_id,
                old_level, new_level = progress.new_level, "User levelled up"
            );
        } else if inserted > 0 {
            debug!(telegram_id, inserted, "Back-filled level history");
        }

        Ok(progress)
    }
}
