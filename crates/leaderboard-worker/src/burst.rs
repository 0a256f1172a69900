use std::sync::Arc;

use lingo_xp_core::{BatchRequest, LeaderboardProcedure, LeaderboardWorkerConfig};
use serde::{Deserialize, Serialize};
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Why a burst ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstOutcome {
    /// The first call found nothing to fold.
    NoWork,
    /// The watermark reached the burst ceiling, or the backlog emptied.
    CaughtUp,
    /// The tick deadline expired before the ceiling was reached.
    DeadlineExhausted,
    /// A call reported work but did not advance the watermark.
    Stalled,
    /// A call failed; the next tick retries.
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurstReport {
    /// Procedure calls attempted, including a failed or timed-out last one.
    pub calls: u32,
    /// Calls that folded events.
    pub batches: u32,
    pub events_folded: i64,
    pub applied_xp: i64,
    /// `to_id` of the first call; fixed for the rest of the burst.
    pub ceiling: Option<i64>,
    pub last_watermark: Option<i64>,
    pub outcome: BurstOutcome,
}

impl BurstReport {
    fn new() -> Self {
        Self {
            calls: 0,
            batches: 0,
            events_folded: 0,
            applied_xp: 0,
            ceiling: None,
            last_watermark: None,
            outcome: BurstOutcome::NoWork,
        }
    }

    fn finish(mut self, outcome: BurstOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

/// Runs one burst against the batch procedure.
pub struct BurstController {
    procedure: Arc<dyn LeaderboardProcedure>,
    request: BatchRequest,
    relief: Duration,
    deadline: Instant,
}

impl BurstController {
    /// Fixes the request and the burst deadline from `config`.
    #[must_use]
    pub fn new(procedure: Arc<dyn LeaderboardProcedure>, config: &LeaderboardWorkerConfig) -> Self {
        Self {
            procedure,
            request: BatchRequest::from(config),
            relief: config.timeout_relief(),
            deadline: Instant::now() + config.outer_timeout(),
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub async fn run(&self, cancel: &CancellationToken) -> BurstReport {
        let worker = self.request.worker_name.as_str();
        let mut report = BurstReport::new();

        loop {
            if report.calls > 0 && Instant::now() >= self.deadline {
                warn!(worker, calls = report.calls, "Leaderboard burst hit its deadline");
                return report.finish(BurstOutcome::DeadlineExhausted);
            }

            report.calls += 1;
            let call = time::timeout_at(self.deadline, self.procedure.execute(&self.request));
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return report.finish(BurstOutcome::Cancelled),
                result = call => result,
            };

            let batch = match result {
                Ok(Ok(batch)) => batch,
                Ok(Err(e)) => {
                    error!(worker, error = %e, "Leaderboard batch call failed");
                    return report.finish(BurstOutcome::Failed(format!("{e:#}")));
                }
                Err(_) => {
                    warn!(worker, calls = report.calls, "Leaderboard batch call outlived the tick deadline");
                    return report.finish(BurstOutcome::DeadlineExhausted);
                }
            };

            if let Some(previous) = report.last_watermark {
                if batch.new_last_event_id < previous {
                    warn!(
                        worker,
                        previous,
                        current = batch.new_last_event_id,
                        "Leaderboard watermark moved backwards"
                    );
                }
            }
            let ceiling = *report.ceiling.get_or_insert(batch.to_id);
            report.last_watermark = Some(batch.new_last_event_id);

            if !batch.processed {
                let outcome = if report.batches == 0 {
                    BurstOutcome::NoWork
                } else {
                    BurstOutcome::CaughtUp
                };
                return report.finish(outcome);
            }

            report.batches += 1;
            report.events_folded += i64::from(batch.batch_count);
            report.applied_xp += batch.applied_xp;
            debug!(
                worker,
                from_id = batch.from_id,
                new_last_event_id = batch.new_last_event_id,
                ceiling,
                batch_count = batch.batch_count,
                groups = batch.groups_count,
                applied_xp = batch.applied_xp,
                "Folded leaderboard batch"
            );

            if batch.new_last_event_id <= batch.from_id {
                warn!(worker, watermark = batch.new_last_event_id, "Leaderboard batch made no progress");
                return report.finish(BurstOutcome::Stalled);
            }
            if batch.new_last_event_id >= ceiling {
                return report.finish(BurstOutcome::CaughtUp);
            }

            let relief_until = (Instant::now() + self.relief).min(self.deadline);
            tokio::select! {
                biased;
                () = cancel.cancelled() => return report.finish(BurstOutcome::Cancelled),
                () = time::sleep_until(relief_until) => {}
            }
        }
    }
}
