//! Notification persistence.

use async_trait::async_trait;
use lingo_xp_core::{NewNotification, Notification, NotificationRepository, ProgressionError};

use crate::database::PgTx;

/// Repository for notification rows.
#[derive(Debug, Clone, Default)]
pub struct PgNotificationRepository;

impl PgNotificationRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationRepository<PgTx> for PgNotificationRepository {
    async fn create_many(
        &self,
        tx: &mut PgTx,
        notifications: Vec<NewNotification>,
    ) -> Result<Vec<Notification>, ProgressionError> {
        if notifications.is_empty() {
            return Ok(Vec::new());
        }

        let mut telegram_ids = Vec::with_capacity(notifications.len());
        let mut kinds = Vec::with_capacity(notifications.len());
        let mut messages = Vec::with_capacity(notifications.len());
        for notification in notifications {
            telegram_ids.push(notification.telegram_id);
            kinds.push(notification.kind.as_str().to_string());
            messages.push(notification.message);
        }

        let mut created = sqlx::query_as::<_, Notification>(
            r"
            INSERT INTO notifications (telegram_id, kind, message)
            SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[])
            RETURNING id, telegram_id, kind, message, created_at
            ",
        )
        .bind(&telegram_ids)
        .bind(&kinds)
        .bind(&messages)
        .fetch_all(&mut **tx)
        .await?;

        created.sort_by_key(|n| n.id);
        Ok(created)
    }
}
