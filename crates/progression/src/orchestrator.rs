//! Event Ingestion Orchestrator.
//!
//! One call appends an XP event and applies every consequence of it in a
//! single unit of work: stats sync, level history, currency, streak,
//! achievements and notification rows. Live delivery runs after commit.

use std::sync::Arc;

use lingo_xp_core::{
    AchievementRepository, ActionCounters, CurrencyAccrual, EventTypeRepository,
    InternalCurrencyRepository, LevelProgress, LevelRepository, MessageBus, Notification,
    NotificationRepository, PresenceCache, ProgressionError, UnitOfWork, UnlockedAchievement,
    UserRepository, UserStats, UserStatsRepository, XpEvent, XpEventRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::fanout::{build_notifications, DeliveryReport, NotificationFanout};
use crate::rewards::RewardDispatcher;

/// Committed effects of one ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub event: XpEvent,
    pub stats: UserStats,
    pub level: LevelProgress,
    pub accrual: Option<CurrencyAccrual>,
    /// True if this ingestion advanced the daily streak.
    pub streak_incremented: bool,
    pub achievements: Vec<UnlockedAchievement>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub summary: IngestionSummary,
    pub delivery: DeliveryReport,
}

pub struct EventIngestionOrchestrator<U: UnitOfWork> {
    uow: U,
    users: Arc<dyn UserRepository<U::Tx>>,
    user_stats: Arc<dyn UserStatsRepository<U::Tx>>,
    event_types: Arc<dyn EventTypeRepository<U::Tx>>,
    xp_events: Arc<dyn XpEventRepository<U::Tx>>,
    levels: Arc<dyn LevelRepository<U::Tx>>,
    rewards: RewardDispatcher<U::Tx>,
    fanout: NotificationFanout<U::Tx>,
}

impl<U: UnitOfWork> EventIngestionOrchestrator<U> {
    #[must_use]
    pub fn builder(uow: U) -> OrchestratorBuilder<U> {
        OrchestratorBuilder::new(uow)
    }

    /// Ingests one user action.
    ///
    /// Any error before commit rolls back the whole unit of work. Delivery
    /// problems are reported in [`IngestionOutcome::delivery`] and never
    /// turn a committed ingestion into an error.
    ///
    /// # Errors
    /// Returns `InvalidCounters` before opening a transaction, the not-found
    /// and constraint errors of the collaborators, or infrastructure errors.
    #[instrument(skip(self, counters))]
    pub async fn execute(
        &self,
        telegram_id: i64,
        event_type_name: &str,
        counters: &ActionCounters,
    ) -> Result<IngestionOutcome, ProgressionError> {
        counters.validate()?;

        let mut tx = self.uow.begin().await?;
        let summary = match self
            .apply(&mut tx, telegram_id, event_type_name, counters)
            .await
        {
            Ok(summary) => summary,
            Err(err) => {
                if let Err(rollback_err) = self.uow.rollback(tx).await {
                    warn!(error = %rollback_err, "Rollback after failed ingestion also failed");
                }
                debug!(error = %err, "Ingestion rolled back");
                return Err(err);
            }
        };
        self.uow.commit(tx).await?;

        info!(
            event_id = summary.event.id,
            xp_total = summary.stats.xp_total,
            level = summary.level.new_level,
            level_up = summary.level.is_level_up,
            achievements = summary.achievements.len(),
            "Ingested XP event"
        );

        let delivery = self
            .fanout
            .deliver(telegram_id, &summary.notifications)
            .await;
        Ok(IngestionOutcome { summary, delivery })
    }

    async fn apply(
        &self,
        tx: &mut U::Tx,
        telegram_id: i64,
        event_type_name: &str,
        counters: &ActionCounters,
    ) -> Result<IngestionSummary, ProgressionError> {
        if !self.users.exists_by_telegram_id(tx, telegram_id).await? {
            return Err(ProgressionError::UserNotFound(telegram_id));
        }
        if !self.user_stats.exists_by_telegram_id(tx, telegram_id).await? {
            return Err(ProgressionError::UserStatsNotFound(telegram_id));
        }
        if !self.event_types.exists_by_name(tx, event_type_name).await? {
            return Err(ProgressionError::EventTypeNotFound(
                event_type_name.to_string(),
            ));
        }
        let event_type = self.event_types.get_by_name(tx, event_type_name).await?;

        let event = self
            .xp_events
            .create(tx, telegram_id, &event_type.name, event_type.xp_delta)
            .await?;
        let stats = self.user_stats.sync(tx, telegram_id, counters).await?;
        let level = self
            .levels
            .back_fill_missing_level_history(tx, telegram_id)
            .await?;
        let accrual = self.rewards.accrue(tx, telegram_id, &event_type).await?;

        let streak_incremented = if self
            .user_stats
            .has_streak_incremented_today(tx, telegram_id)
            .await?
        {
            false
        } else {
            self.user_stats
                .ensure_streak_increment_today(tx, telegram_id)
                .await?;
            true
        };

        let achievements = self.rewards.unlock(tx, telegram_id).await?;

        let staged = build_notifications(
            telegram_id,
            &event_type,
            &level,
            &achievements,
            accrual.as_ref(),
        );
        let notifications = self.fanout.stage(tx, staged).await?;

        Ok(IngestionSummary {
            event,
            stats,
            level,
            accrual,
            streak_incremented,
            achievements,
            notifications,
        })
    }
}

/// Collects the orchestrator's collaborators; [`build`](Self::build) checks
/// that none is missing.
pub struct OrchestratorBuilder<U: UnitOfWork> {
    uow: U,
    users: Option<Arc<dyn UserRepository<U::Tx>>>,
    user_stats: Option<Arc<dyn UserStatsRepository<U::Tx>>>,
    event_types: Option<Arc<dyn EventTypeRepository<U::Tx>>>,
    xp_events: Option<Arc<dyn XpEventRepository<U::Tx>>>,
    levels: Option<Arc<dyn LevelRepository<U::Tx>>>,
    currency: Option<Arc<dyn InternalCurrencyRepository<U::Tx>>>,
    achievements: Option<Arc<dyn AchievementRepository<U::Tx>>>,
    notifications: Option<Arc<dyn NotificationRepository<U::Tx>>>,
    presence: Option<Arc<dyn PresenceCache>>,
    bus: Option<Arc<dyn MessageBus>>,
}

impl<U: UnitOfWork> OrchestratorBuilder<U> {
    #[must_use]
    pub fn new(uow: U) -> Self {
        Self {
            uow,
            users: None,
            user_stats: None,
            event_types: None,
            xp_events: None,
            levels: None,
            currency: None,
            achievements: None,
            notifications: None,
            presence: None,
            bus: None,
        }
    }

    #[must_use]
    pub fn users(mut self, repo: impl UserRepository<U::Tx> + 'static) -> Self {
        self.users = Some(Arc::new(repo));
        self
    }

    #[must_use]
    pub fn user_stats(mut self, repo: impl UserStatsRepository<U::Tx> + 'static) -> Self {
        self.user_stats = Some(Arc::new(repo));
        self
    }

    #[must_use]
    pub fn event_types(mut self, repo: impl EventTypeRepository<U::Tx> + 'static) -> Self {
        self.event_types = Some(Arc::new(repo));
        self
    }

    #[must_use]
    pub fn xp_events(mut self, repo: impl XpEventRepository<U::Tx> + 'static) -> Self {
        self.xp_events = Some(Arc::new(repo));
        self
    }

    #[must_use]
    pub fn levels(mut self, repo: impl LevelRepository<U::Tx> + 'static) -> Self {
        self.levels = Some(Arc::new(repo));
        self
    }

    #[must_use]
    pub fn currency(mut self, repo: impl InternalCurrencyRepository<U::Tx> + 'static) -> Self {
        self.currency = Some(Arc::new(repo));
        self
    }

    #[must_use]
    pub fn achievements(mut self, repo: impl AchievementRepository<U::Tx> + 'static) -> Self {
        self.achievements = Some(Arc::new(repo));
        self
    }

    #[must_use]
    pub fn notifications(mut self, repo: impl NotificationRepository<U::Tx> + 'static) -> Self {
        self.notifications = Some(Arc::new(repo));
        self
    }

    #[must_use]
    pub fn presence(mut self, cache: impl PresenceCache + 'static) -> Self {
        self.presence = Some(Arc::new(cache));
        self
    }

    #[must_use]
    pub fn message_bus(mut self, bus: impl MessageBus + 'static) -> Self {
        self.bus = Some(Arc::new(bus));
        self
    }

    /// # Errors
    /// Returns `MissingCollaborator` naming the first capability never provided.
    pub fn build(self) -> Result<EventIngestionOrchestrator<U>, ProgressionError> {
        fn require<T>(slot: Option<T>, name: &'static str) -> Result<T, ProgressionError> {
            slot.ok_or(ProgressionError::MissingCollaborator(name))
        }

        Ok(EventIngestionOrchestrator {
            users: require(self.users, "users")?,
            user_stats: require(self.user_stats, "user_stats")?,
            event_types: require(self.event_types, "event_types")?,
            xp_events: require(self.xp_events, "xp_events")?,
            levels: require(self.levels, "levels")?,
            rewards: RewardDispatcher::new(
                require(self.currency, "currency")?,
                require(self.achievements, "achievements")?,
            ),
            fanout: NotificationFanout::new(
                require(self.notifications, "notifications")?,
                require(self.presence, "presence")?,
                require(self.bus, "message_bus")?,
            ),
            uow: self.uow,
        })
    }
}
