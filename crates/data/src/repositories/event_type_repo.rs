//! Event type lookups.

use async_trait::async_trait;
use lingo_xp_core::{EventType, EventTypeRepository, ProgressionError};

use crate::database::PgTx;

/// Repository for configured event types.
#[derive(Debug, Clone, Default)]
pub struct PgEventTypeRepository;

impl PgEventTypeRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventTypeRepository<PgTx> for PgEventTypeRepository {
    async fn exists_by_name(&self, tx: &mut PgTx, name: &str) -> Result<bool, ProgressionError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM event_types WHERE name = $1 AND enabled)",
        )
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
        Ok(exists)
    }

    async fn get_by_name(&self, tx: &mut PgTx, name: &str) -> Result<EventType, ProgressionError> {
        sqlx::query_as::<_, EventType>(
            r"
            SELECT id, name, xp_delta, reward_amount, description, enabled
            FROM event_types
            WHERE name = $1 AND enabled
            ",
        )
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| ProgressionError::EventTypeNotFound(name.to_string()))
    }
}
