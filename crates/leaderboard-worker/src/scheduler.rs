use std::sync::Arc;

use anyhow::{Context, Result};
use lingo_xp_core::{LeaderboardProcedure, LeaderboardWorkerConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::burst::{BurstController, BurstOutcome, BurstReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Idle,
    Ticking,
    Bursting,
}

pub struct LeaderboardWorker {
    procedure: Arc<dyn LeaderboardProcedure>,
    config: LeaderboardWorkerConfig,
    updates: Option<watch::Receiver<LeaderboardWorkerConfig>>,
    state: watch::Sender<WorkerState>,
}

impl LeaderboardWorker {
    /// Creates a worker with a fixed configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(
        procedure: Arc<dyn LeaderboardProcedure>,
        config: LeaderboardWorkerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            procedure,
            config,
            updates: None,
            state: watch::Sender::new(WorkerState::Idle),
        })
    }

    /// Creates a worker that adopts new configurations at the start of each tick.
    ///
    /// # Errors
    /// Returns an error if the current configuration is invalid.
    pub fn with_config_updates(
        procedure: Arc<dyn LeaderboardProcedure>,
        mut updates: watch::Receiver<LeaderboardWorkerConfig>,
    ) -> Result<Self> {
        let config = updates.borrow_and_update().clone();
        let mut worker = Self::new(procedure, config)?;
        worker.updates = Some(updates);
        Ok(worker)
    }

    #[must_use]
    pub fn config(&self) -> &LeaderboardWorkerConfig {
        &self.config
    }

    /// Runs a single tick outside the schedule.
    pub async fn run_tick(&self) -> BurstReport {
        self.tick(&CancellationToken::new()).await
    }

    /// Spawns the tick loop. It runs until `cancel` fires or the handle is stopped.
    pub fn start(self, cancel: CancellationToken) -> WorkerHandle {
        let state = self.state.subscribe();
        let task = tokio::spawn(self.run(cancel.clone()));
        WorkerHandle {
            cancel,
            state,
            task,
        }
    }

    async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = ticker(self.config.sleep_duration(), Instant::now());
        info!(
            worker = %self.config.worker_name,
            interval = ?self.config.sleep_duration(),
            batch_size = self.config.batch_size,
            "Leaderboard worker started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.refresh_config() {
                        let period = self.config.sleep_duration();
                        ticker = ticker_after(period);
                    }
                    if !self.config.enabled {
                        debug!(worker = %self.config.worker_name, "Leaderboard worker disabled, skipping tick");
                        continue;
                    }
                    let report = self.tick(&cancel).await;
                    if report.outcome == BurstOutcome::Cancelled {
                        break;
                    }
                }
            }
        }

        self.state.send_replace(WorkerState::Idle);
        info!(worker = %self.config.worker_name, "Leaderboard worker stopped");
    }

    async fn tick(&self, cancel: &CancellationToken) -> BurstReport {
        self.state.send_replace(WorkerState::Ticking);
        let controller = BurstController::new(self.procedure.clone(), &self.config);

        self.state.send_replace(WorkerState::Bursting);
        let report = controller.run(cancel).await;
        self.state.send_replace(WorkerState::Idle);

        if report.events_folded > 0 {
            info!(
                worker = %self.config.worker_name,
                calls = report.calls,
                events = report.events_folded,
                applied_xp = report.applied_xp,
                watermark = report.last_watermark,
                outcome = ?report.outcome,
                "Leaderboard tick finished"
            );
        } else {
            debug!(worker = %self.config.worker_name, outcome = ?report.outcome, "Leaderboard tick finished");
        }
        report
    }

    /// Adopts a pending configuration update. Returns true if the tick interval changed.
    fn refresh_config(&mut self) -> bool {
        let Some(updates) = self.updates.as_mut() else {
            return false;
        };
        if !updates.has_changed().unwrap_or(false) {
            return false;
        }

        let candidate = updates.borrow_and_update().clone();
        if candidate == self.config {
            return false;
        }
        if let Err(e) = candidate.validate() {
            warn!(error = %e, "Ignoring invalid leaderboard worker configuration");
            return false;
        }

        let interval_changed = candidate.sleep_duration != self.config.sleep_duration;
        info!(
            worker = %candidate.worker_name,
            batch_size = candidate.batch_size,
            interval = ?candidate.sleep_duration(),
            "Applied leaderboard worker configuration"
        );
        self.config = candidate;
        interval_changed
    }
}

fn ticker(period: Duration, start: Instant) -> Interval {
    let mut interval = time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

fn ticker_after(period: Duration) -> Interval {
    ticker(period, Instant::now() + period)
}

/// Handle to a running [`LeaderboardWorker`].
pub struct WorkerHandle {
    cancel: CancellationToken,
    state: watch::Receiver<WorkerState>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the worker and waits for its loop to exit.
    ///
    /// # Errors
    /// Returns an error if the worker task panicked.
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        self.task.await.context("Leaderboard worker task failed")?;
        Ok(())
    }
}
