//! PostgreSQL persistence for XP progression.
//!
//! This crate provides:
//! - Database client, migrations and the `PgUnitOfWork`
//! - Transactional repositories for the ingestion pipeline
//! - The weekly leaderboard batch procedure client
//! - Presence lookups and `pg_notify` delivery

pub mod database;
pub mod message_bus;
pub mod presence;
pub mod repositories;

pub use database::{DatabaseClient, PgTx, PgUnitOfWork};
pub use message_bus::{notification_channel, PgNotifyBus};
pub use presence::PgPresenceCache;
pub use repositories::{
    PgAchievementRepository, PgEventTypeRepository, PgInternalCurrencyRepository,
    PgLeaderboardProcedure, PgLeaderboardRepository, PgLevelRepository, PgNotificationRepository,
    PgUserRepository, PgUserStatsRepository, PgXpEventRepository, Repositories,
};
