pub mod config;
pub mod config_loader;
pub mod config_watcher;
pub mod error;
pub mod models;
pub mod traits;

pub use config::{
    AppConfig, DatabaseConfig, LeaderboardWorkerConfig, PresenceConfig,
    STATEMENT_TIMEOUT_SAFETY_MARGIN,
};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use config_watcher::ConfigWatcher;
pub use error::ProgressionError;
pub use models::{
    week_start_of, week_start_of_date, ActionCounters, BatchRequest, BatchResult,
    CurrencyAccrual, EventType, LevelHistoryEntry, LevelProgress, NewNotification, Notification,
    NotificationKind, UnlockedAchievement, UserStats, WeeklyLeaderboardEntry, XpEvent,
};
pub use traits::{
    AchievementRepository, EventTypeRepository, InternalCurrencyRepository, LeaderboardProcedure,
    LevelRepository, MessageBus, NotificationRepository, PresenceCache, UnitOfWork,
    UserRepository, UserStatsRepository, XpEventRepository,
};
