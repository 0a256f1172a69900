//! Real-time delivery over `LISTEN`/`NOTIFY`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lingo_xp_core::{MessageBus, Notification};
use sqlx::PgPool;
use tracing::debug;

/// Channel a user's client listens on.
#[must_use]
pub fn notification_channel(telegram_id: i64) -> String {
    format!("user_notifications_{telegram_id}")
}

/// Publishes notifications as JSON payloads via `pg_notify`.
#[derive(Debug, Clone)]
pub struct PgNotifyBus {
    pool: PgPool,
}

impl PgNotifyBus {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageBus for PgNotifyBus {
    async fn publish(&self, telegram_id: i64, notification: &Notification) -> Result<()> {
        let channel = notification_channel(telegram_id);
        let payload =
            serde_json::to_string(notification).context("Failed to encode notification")?;

        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(&channel)
            .bind(&payload)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to publish on {channel}"))?;

        debug!(telegram_id, notification_id = notification.id, %channel, "Published notification");
        Ok(())
    }
}
