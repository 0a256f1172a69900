//! PostgreSQL repositories for the progression pipeline.
//!
//! Transactional repositories are stateless and run against the `PgTx` handed
//! in by the caller; the leaderboard repositories own a pool.

pub mod achievement_repo;
pub mod currency_repo;
pub mod event_type_repo;
pub mod leaderboard_repo;
pub mod level_repo;
pub mod notification_repo;
pub mod user_repo;
pub mod xp_event_repo;

pub use achievement_repo::PgAchievementRepository;
pub use currency_repo::PgInternalCurrencyRepository;
pub use event_type_repo::PgEventTypeRepository;
pub use leaderboard_repo::{PgLeaderboardProcedure, PgLeaderboardRepository};
pub use level_repo::PgLevelRepository;
pub use notification_repo::PgNotificationRepository;
pub use user_repo::{PgUserRepository, PgUserStatsRepository};
pub use xp_event_repo::PgXpEventRepository;

use sqlx::PgPool;

/// Creates all repositories from a single database pool.
pub struct Repositories {
    pub users: PgUserRepository,
    pub user_stats: PgUserStatsRepository,
    pub event_types: PgEventTypeRepository,
    pub xp_events: PgXpEventRepository,
    pub levels: PgLevelRepository,
    pub currency: PgInternalCurrencyRepository,
    pub achievements: PgAchievementRepository,
    pub notifications: PgNotificationRepository,
    pub leaderboard: PgLeaderboardRepository,
    pub leaderboard_procedure: PgLeaderboardProcedure,
}

impl Repositories {
    /// Creates a new set of repositories from a database pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: PgUserRepository::new(),
            user_stats: PgUserStatsRepository::new(),
            event_types: PgEventTypeRepository::new(),
            xp_events: PgXpEventRepository::new(),
            levels: PgLevelRepository::new(),
            currency: PgInternalCurrencyRepository::new(),
            achievements: PgAchievementRepository::new(),
            notifications: PgNotificationRepository::new(),
            leaderboard: PgLeaderboardRepository::new(pool.clone()),
            leaderboard_procedure: PgLeaderboardProcedure::new(pool),
        }
    }
}
