//! Append-only XP ledger.

use async_trait::async_trait;
use lingo_xp_core::{ProgressionError, XpEvent, XpEventRepository};
use tracing::debug;

use crate::database::PgTx;

/// Repository appending immutable XP events.
///
/// Appends go through `xp_event_append`, which must be the first write of the
/// transaction so ids follow transaction ids; weeks are cut in UTC.
#[derive(Debug, Clone, Default)]
pub struct PgXpEventRepository;

impl PgXpEventRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl XpEventRepository<PgTx> for PgXpEventRepository {
    async fn create(
        &self,
        tx: &mut PgTx,
        telegram_id: i64,
        event_type_name: &str,
        delta_xp: i64,
    ) -> Result<XpEvent, ProgressionError> {
        let event = sqlx::query_as::<_, XpEvent>(
            r"
            SELECT id, event_type_id, telegram_id, delta_xp, occurred_at, inserted_at, week_start
            FROM xp_event_append($1, $2, $3)
            ",
        )
        .bind(telegram_id)
        .bind(event_type_name)
        .bind(delta_xp)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| ProgressionError::EventTypeNotFound(event_type_name.to_string()))?;

        debug!(
            telegram_id,
            xp_event_id = event.id,
            delta_xp,
            "Appended XP event"
        );
        Ok(event)
    }
}
