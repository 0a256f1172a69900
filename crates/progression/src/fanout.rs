//! Notification staging and presence-gated delivery.
//!
//! Rows are written inside the ingestion transaction; delivery happens after
//! commit and never fails the ingestion.

use std::sync::Arc;

use lingo_xp_core::{
    CurrencyAccrual, EventType, LevelProgress, MessageBus, NewNotification, Notification,
    NotificationKind, NotificationRepository, PresenceCache, ProgressionError, UnlockedAchievement,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Result of the best-effort delivery step, kept apart from the ingestion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryReport {
    NothingToDeliver,
    UserAbsent,
    /// The presence lookup failed; nothing was published.
    PresenceUnavailable,
    Published { delivered: usize, failed: usize },
}

/// Builds the notifications for one ingestion's user-visible side effects.
///
/// Always one mini-game notification, then a level-up, one per unlocked
/// achievement, and a currency notification when funds were accrued.
#[must_use]
pub fn build_notifications(
    telegram_id: i64,
    event_type: &EventType,
    level: &LevelProgress,
    achievements: &[UnlockedAchievement],
    accrual: Option<&CurrencyAccrual>,
) -> Vec<NewNotification> {
    let mut notifications = Vec::with_capacity(2 + achievements.len() + 1);
    let mut push = |kind, message: String| {
        notifications.push(NewNotification {
            telegram_id,
            kind,
            message,
        });
    };

    push(
        NotificationKind::MiniGame,
        format!("+{} XP for {}", event_type.xp_delta, event_type.name),
    );
    if level.is_level_up {
        push(
            NotificationKind::LevelUp,
            format!("Level up! {} -> {}", level.old_level, level.new_level),
        );
    }
    for achievement in achievements {
        push(
            NotificationKind::Achievement,
            format!("Achievement unlocked: {}", achievement.achievement_name),
        );
    }
    if let Some(accrual) = accrual {
        push(
            NotificationKind::Currency,
            format!("+{} coins, balance {}", accrual.amount, accrual.balance),
        );
    }

    notifications
}

pub struct NotificationFanout<Tx> {
    notifications: Arc<dyn NotificationRepository<Tx>>,
    presence: Arc<dyn PresenceCache>,
    bus: Arc<dyn MessageBus>,
}

impl<Tx: Send> NotificationFanout<Tx> {
    #[must_use]
    pub fn new(
        notifications: Arc<dyn NotificationRepository<Tx>>,
        presence: Arc<dyn PresenceCache>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            notifications,
            presence,
            bus,
        }
    }

    /// Persists notifications inside the caller's transaction.
    ///
    /// # Errors
    /// Propagates repository errors.
    pub async fn stage(
        &self,
        tx: &mut Tx,
        notifications: Vec<NewNotification>,
    ) -> Result<Vec<Notification>, ProgressionError> {
        self.notifications.create_many(tx, notifications).await
    }

    /// Publishes persisted notifications if the user is present.
    ///
    /// Failures are logged and counted, never returned.
    pub async fn deliver(&self, telegram_id: i64, notifications: &[Notification]) -> DeliveryReport {
        if notifications.is_empty() {
            return DeliveryReport::NothingToDeliver;
        }

        match self.presence.exists(telegram_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(telegram_id, "User not present, skipping live delivery");
                return DeliveryReport::UserAbsent;
            }
            Err(e) => {
                warn!(telegram_id, error = %e, "Presence lookup failed, skipping live delivery");
                return DeliveryReport::PresenceUnavailable;
            }
        }

        let mut delivered = 0;
        let mut failed = 0;
        for notification in notifications {
            match self.bus.publish(telegram_id, notification).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    warn!(
                        telegram_id,
                        notification_id = notification.id,
                        error = %e,
                        "Failed to publish notification"
                    );
                }
            }
        }

        DeliveryReport::Published { delivered, failed }
    }
}
