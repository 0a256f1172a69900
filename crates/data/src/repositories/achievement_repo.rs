//! Achievement unlocking.

use async_trait::async_trait;
use lingo_xp_core::{AchievementRepository, ProgressionError, UnlockedAchievement};

use crate::database::PgTx;

/// Repository unlocking achievements whose criteria the user's stats satisfy.
#[derive(Debug, Clone, Default)]
pub struct PgAchievementRepository;

impl PgAchievementRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AchievementRepository<PgTx> for PgAchievementRepository {
    async fn unlock_available(
        &self,
        tx: &mut PgTx,
        telegram_id: i64,
    ) -> Result<Vec<UnlockedAchievement>, ProgressionError> {
        let unlocked = sqlx::query_as::<_, UnlockedAchievement>(
            r"
            WITH eligible AS (
                SELECT a.id, a.name
                FROM achievements a
                JOIN user_stats s ON s.telegram_id = $1
                WHERE a.enabled
                  AND CASE a.metric
                        WHEN 'xp_total' THEN s.xp_total
                        WHEN 'level' THEN s.level::BIGINT
                        WHEN 'streak_days' THEN s.streak_days::BIGINT
                        WHEN 'words_learned' THEN s.words_learned
                        WHEN 'tasks_completed' THEN s.tasks_completed
                        WHEN 'mini_games_played' THEN s.mini_games_played
                      END >= a.threshold
            ),
            inserted AS (
                INSERT INTO user_achievements (telegram_id, achievement_id)
                SELECT $1, e.id FROM eligible e
                ON CONFLICT (telegram_id, achievement_id) DO NOTHING
                RETURNING achievement_id
            )
            SELECT e.id AS achievement_id, e.name AS achievement_name
            FROM eligible e
            JOIN inserted i ON i.achievement_id = e.id
            ORDER BY e.id
            ",
        )
        .bind(telegram_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(unlocked)
    }
}
