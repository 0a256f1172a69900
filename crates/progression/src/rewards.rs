use std::sync::Arc;

use lingo_xp_core::{
    AchievementRepository, CurrencyAccrual, EventType, InternalCurrencyRepository,
    ProgressionError, UnlockedAchievement,
};
use tracing::debug;

/// Currency accrual and achievement unlocking for one ingestion.
pub struct RewardDispatcher<Tx> {
    currency: Arc<dyn InternalCurrencyRepository<Tx>>,
    achievements: Arc<dyn AchievementRepository<Tx>>,
}

impl<Tx: Send> RewardDispatcher<Tx> {
    #[must_use]
    pub fn new(
        currency: Arc<dyn InternalCurrencyRepository<Tx>>,
        achievements: Arc<dyn AchievementRepository<Tx>>,
    ) -> Self {
        Self {
            currency,
            achievements,
        }
    }

    /// Credits the event type's reward, if it has a strictly positive one.
    ///
    /// # Errors
    /// Propagates balance validation and database errors from the currency repository.
    pub async fn accrue(
        &self,
        tx: &mut Tx,
        telegram_id: i64,
        event_type: &EventType,
    ) -> Result<Option<CurrencyAccrual>, ProgressionError> {
        let Some(amount) = event_type.positive_reward() else {
            return Ok(None);
        };

        let description = event_type
            .description
            .clone()
            .unwrap_or_else(|| format!("Reward for {}", event_type.name));
        let balance = self
            .currency
            .add_balance(tx, event_type.id, telegram_id, amount, &description)
            .await?;

        debug!(telegram_id, %amount, %balance, "Accrued internal currency");
        Ok(Some(CurrencyAccrual { amount, balance }))
    }

    /// Unlocks every achievement the user's current stats satisfy.
    ///
    /// # Errors
    /// Propagates repository errors.
    pub async fn unlock(
        &self,
        tx: &mut Tx,
        telegram_id: i64,
    ) -> Result<Vec<UnlockedAchievement>, ProgressionError> {
        self.achievements.unlock_available(tx, telegram_id).await
    }
}
