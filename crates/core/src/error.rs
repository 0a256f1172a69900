use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by event ingestion.
///
/// Every variant aborts the surrounding transaction; nothing is clamped or
/// retried inside the orchestrator.
#[derive(Error, Debug)]
pub enum ProgressionError {
    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("stats for user {0} not found")]
    UserStatsNotFound(i64),

    #[error("event type '{0}' not found or disabled")]
    EventTypeNotFound(String),

    #[error("currency accrual amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("balance of user {telegram_id} would become negative ({balance})")]
    NegativeBalance { telegram_id: i64, balance: Decimal },

    #[error("invalid action counters: {0}")]
    InvalidCounters(String),

    #[error("orchestrator is missing its {0} collaborator")]
    MissingCollaborator(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl ProgressionError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_) | Self::UserStatsNotFound(_) | Self::EventTypeNotFound(_)
        )
    }

    #[must_use]
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            Self::NonPositiveAmount(_) | Self::NegativeBalance { .. } | Self::InvalidCounters(_)
        )
    }

    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Infrastructure(_))
    }
}
