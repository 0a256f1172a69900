//! Domain records shared by the ingestion pipeline and the leaderboard worker.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::LeaderboardWorkerConfig;
use crate::error::ProgressionError;

/// Configured kind of user action that awards XP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventType {
    pub id: i32,
    pub name: String,
    pub xp_delta: i64,
    /// Internal currency accrued per event; `None` or non-positive means no reward.
    pub reward_amount: Option<Decimal>,
    pub description: Option<String>,
    pub enabled: bool,
}

impl EventType {
    /// Returns the reward to accrue, if the event type carries a strictly positive one.
    #[must_use]
    pub fn positive_reward(&self) -> Option<Decimal> {
        self.reward_amount.filter(|amount| *amount > Decimal::ZERO)
    }
}

/// Immutable XP ledger row. `id` ordering is the only ordering the
/// leaderboard worker relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct XpEvent {
    pub id: i64,
    pub event_type_id: i32,
    pub telegram_id: i64,
    pub delta_xp: i64,
    pub occurred_at: DateTime<Utc>,
    pub inserted_at: DateTime<Utc>,
    pub week_start: NaiveDate,
}

/// Per-user rolling aggregate, mutated only by the stats aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserStats {
    pub telegram_id: i64,
    pub streak_days: i32,
    pub longest_streak: i32,
    pub last_streak_date: Option<NaiveDate>,
    pub words_learned: i64,
    pub tasks_completed: i64,
    pub mini_games_played: i64,
    pub xp_total: i64,
    pub level: i32,
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Counters reported by the client alongside an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounters {
    pub words_learned: i64,
    pub tasks_completed: i64,
    pub mini_games_played: i64,
}

impl ActionCounters {
    /// Rejects negative counters; stats are never decremented by ingestion.
    ///
    /// # Errors
    /// Returns `InvalidCounters` naming the first negative field.
    pub fn validate(&self) -> Result<(), ProgressionError> {
        let fields = [
            ("words_learned", self.words_learned),
            ("tasks_completed", self.tasks_completed),
            ("mini_games_played", self.mini_games_played),
        ];
        match fields.iter().find(|(_, value)| *value < 0) {
            Some((name, value)) => Err(ProgressionError::InvalidCounters(format!(
                "{name} must not be negative, got {value}"
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LevelHistoryEntry {
    pub telegram_id: i64,
    pub level_number: i32,
    pub xp_at_reach: i64,
    pub xp_event_id: Option<i64>,
    pub reached_at: DateTime<Utc>,
}

/// Result of reconciling level history with the user's current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub is_level_up: bool,
    pub old_level: i32,
    pub new_level: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UnlockedAchievement {
    pub achievement_id: i32,
    pub achievement_name: String,
}

/// Currency credited during one ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAccrual {
    pub amount: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    MiniGame,
    LevelUp,
    Achievement,
    Currency,
}

impl NotificationKind {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MiniGame => "mini_game",
            Self::LevelUp => "level_up",
            Self::Achievement => "achievement",
            Self::Currency => "currency",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mini_game" => Some(Self::MiniGame),
            "level_up" => Some(Self::LevelUp),
            "achievement" => Some(Self::Achievement),
            "currency" => Some(Self::Currency),
            _ => None,
        }
    }
}

/// Notification staged for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub telegram_id: i64,
    pub kind: NotificationKind,
    pub message: String,
}

/// Persisted notification. Rows exist regardless of delivery outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub telegram_id: i64,
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    #[must_use]
    pub fn kind(&self) -> Option<NotificationKind> {
        NotificationKind::parse(&self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeeklyLeaderboardEntry {
    pub telegram_id: i64,
    pub week_start: NaiveDate,
    pub xp: i64,
}

/// Arguments of one leaderboard batch-procedure call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub worker_name: String,
    pub batch_size: i32,
    pub statement_timeout_ms: u64,
    pub lock_timeout_ms: u64,
}

impl From<&LeaderboardWorkerConfig> for BatchRequest {
    fn from(config: &LeaderboardWorkerConfig) -> Self {
        Self {
            worker_name: config.worker_name.clone(),
            batch_size: config.batch_size,
            statement_timeout_ms: config.statement_timeout_ms,
            lock_timeout_ms: config.lock_timeout_ms,
        }
    }
}

/// Response of one leaderboard batch-procedure call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BatchResult {
    pub processed: bool,
    pub from_id: i64,
    /// Highest XP event id below the commit horizon when the call started.
    pub to_id: i64,
    pub new_last_event_id: i64,
    /// Events folded by this call.
    pub batch_count: i32,
    /// Events pending between the watermark and the ceiling, capped at `batch_size + 1`.
    pub new_event_count: i64,
    /// Distinct `(telegram_id, week_start)` groups touched.
    pub groups_count: i32,
    pub applied_xp: i64,
}

/// Monday of the ISO week containing `at`, matching `date_trunc('week', ...)`.
#[must_use]
pub fn week_start_of(at: DateTime<Utc>) -> NaiveDate {
    week_start_of_date(at.date_naive())
}

#[must_use]
pub fn week_start_of_date(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}
