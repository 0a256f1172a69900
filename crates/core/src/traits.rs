//! Capability interfaces consumed by the ingestion orchestrator and the
//! leaderboard worker.
//!
//! Transactional capabilities are generic over the unit of work's transaction
//! type and receive it explicitly; the orchestrator owns begin/commit/rollback.

use crate::error::ProgressionError;
use crate::models::{
    ActionCounters, BatchRequest, BatchResult, EventType, LevelProgress, NewNotification,
    Notification, UnlockedAchievement, UserStats, XpEvent,
};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Opens and finishes database transactions.
///
/// Dropping a transaction that was neither committed nor rolled back must roll it back.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Tx: Send + 'static;

    async fn begin(&self) -> Result<Self::Tx, ProgressionError>;
    async fn commit(&self, tx: Self::Tx) -> Result<(), ProgressionError>;
    async fn rollback(&self, tx: Self::Tx) -> Result<(), ProgressionError>;
}

#[async_trait]
pub trait UserRepository<Tx: Send>: Send + Sync {
    async fn exists_by_telegram_id(
        &self,
        tx: &mut Tx,
        telegram_id: i64,
    ) -> Result<bool, ProgressionError>;
}

#[async_trait]
pub trait UserStatsRepository<Tx: Send>: Send + Sync {
    async fn exists_by_telegram_id(
        &self,
        tx: &mut Tx,
        telegram_id: i64,
    ) -> Result<bool, ProgressionError>;

    /// Merges counters and recomputes XP total and level from the ledger.
    async fn sync(
        &self,
        tx: &mut Tx,
        telegram_id: i64,
        counters: &ActionCounters,
    ) -> Result<UserStats, ProgressionError>;

    async fn has_streak_incremented_today(
        &self,
        tx: &mut Tx,
        telegram_id: i64,
    ) -> Result<bool, ProgressionError>;

    async fn ensure_streak_increment_today(
        &self,
        tx: &mut Tx,
        telegram_id: i64,
    ) -> Result<(), ProgressionError>;
}

#[async_trait]
pub trait EventTypeRepository<Tx: Send>: Send + Sync {
    /// True only for event types that exist and are enabled.
    async fn exists_by_name(&self, tx: &mut Tx, name: &str) -> Result<bool, ProgressionError>;

    async fn get_by_name(&self, tx: &mut Tx, name: &str) -> Result<EventType, ProgressionError>;
}

#[async_trait]
pub trait XpEventRepository<Tx: Send>: Send + Sync {
    async fn create(
        &self,
        tx: &mut Tx,
        telegram_id: i64,
        event_type_name: &str,
        delta_xp: i64,
    ) -> Result<XpEvent, ProgressionError>;
}

#[async_trait]
pub trait LevelRepository<Tx: Send>: Send + Sync {
    /// Inserts every missing history row up to the user's current level.
    async fn back_fill_missing_level_history(
        &self,
        tx: &mut Tx,
        telegram_id: i64,
    ) -> Result<LevelProgress, ProgressionError>;
}

#[async_trait]
pub trait InternalCurrencyRepository<Tx: Send>: Send + Sync {
    /// Credits `amount` under a row lock, writes the audit row, returns the new balance.
    async fn add_balance(
        &self,
        tx: &mut Tx,
        event_type_id: i32,
        telegram_id: i64,
        amount: Decimal,
        description: &str,
    ) -> Result<Decimal, ProgressionError>;
}

#[async_trait]
pub trait AchievementRepository<Tx: Send>: Send + Sync {
    async fn unlock_available(
        &self,
        tx: &mut Tx,
        telegram_id: i64,
    ) -> Result<Vec<UnlockedAchievement>, ProgressionError>;
}

#[async_trait]
pub trait NotificationRepository<Tx: Send>: Send + Sync {
    async fn create_many(
        &self,
        tx: &mut Tx,
        notifications: Vec<NewNotification>,
    ) -> Result<Vec<Notification>, ProgressionError>;
}

/// Fast, non-durable liveness flag.
#[async_trait]
pub trait PresenceCache: Send + Sync {
    async fn exists(&self, telegram_id: i64) -> Result<bool>;
}

/// Real-time delivery channel; callers log failures instead of propagating them.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, telegram_id: i64, notification: &Notification) -> Result<()>;
}

/// Bounded stored procedure folding XP events into the weekly leaderboard.
#[async_trait]
pub trait LeaderboardProcedure: Send + Sync {
    async fn execute(&self, request: &BatchRequest) -> Result<BatchResult>;
}
