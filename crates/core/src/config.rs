use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Headroom added on top of the server-side statement timeout when computing
/// the client-side deadline of a leaderboard tick.
pub const STATEMENT_TIMEOUT_SAFETY_MARGIN: Duration = Duration::from_millis(2_000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub leaderboard: LeaderboardWorkerConfig,
    pub presence: PresenceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Tuning for the weekly leaderboard batch worker.
///
/// `sleep_duration` and `timeout` are expressed in seconds, the remaining
/// timeouts in milliseconds (they are forwarded verbatim to the batch procedure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardWorkerConfig {
    pub enabled: bool,
    /// Identity used for the procedure's watermark row and advisory lock.
    pub worker_name: String,
    pub batch_size: i32,
    pub statement_timeout_ms: u64,
    pub lock_timeout_ms: u64,
    /// Pause between back-to-back calls inside one burst.
    pub timeout_relief_ms: u64,
    /// Tick interval, seconds.
    pub sleep_duration: u64,
    /// Client-side deadline for one tick, seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// How long a presence heartbeat keeps a user eligible for live delivery.
    pub ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/lingo_xp".to_string(),
                max_connections: 10,
                acquire_timeout_secs: 5,
            },
            leaderboard: LeaderboardWorkerConfig::default(),
            presence: PresenceConfig { ttl_secs: 90 },
        }
    }
}

impl Default for LeaderboardWorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_name: "weekly_leaderboard".to_string(),
            batch_size: 500,
            statement_timeout_ms: 3_000,
            lock_timeout_ms: 500,
            timeout_relief_ms: 50,
            sleep_duration: 2,
            timeout: 5,
        }
    }
}

impl LeaderboardWorkerConfig {
    #[must_use]
    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(self.sleep_duration)
    }

    #[must_use]
    pub fn timeout_relief(&self) -> Duration {
        Duration::from_millis(self.timeout_relief_ms)
    }

    #[must_use]
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    /// Deadline for one tick: the configured timeout, raised so that it always
    /// outlives the server-side statement timeout by the safety margin.
    #[must_use]
    pub fn outer_timeout(&self) -> Duration {
        let configured = Duration::from_secs(self.timeout);
        let floor = self.statement_timeout() + STATEMENT_TIMEOUT_SAFETY_MARGIN;
        configured.max(floor)
    }

    /// Checks the values the worker cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.worker_name.trim().is_empty() {
            bail!("leaderboard.worker_name must not be empty");
        }
        if self.batch_size <= 0 {
            bail!("leaderboard.batch_size must be positive, got {}", self.batch_size);
        }
        if self.sleep_duration == 0 {
            bail!("leaderboard.sleep_duration must be at least one second");
        }
        if self.statement_timeout_ms == 0 {
            bail!("leaderboard.statement_timeout_ms must be positive");
        }
        if self.lock_timeout_ms == 0 {
            bail!("leaderboard.lock_timeout_ms must be positive, 0 disables the lock timeout");
        }
        Ok(())
    }
}

impl PresenceConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
