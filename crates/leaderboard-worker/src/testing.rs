//! Scripted batch procedure for worker unit tests.

use std::collections::VecDeque;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lingo_xp_core::{BatchRequest, BatchResult, LeaderboardProcedure, LeaderboardWorkerConfig};
use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

pub struct RecordedCall {
    pub at: Instant,
    pub request: BatchRequest,
}

/// Replays queued responses, then reports no work.
pub struct ScriptedProcedure {
    script: Mutex<VecDeque<Result<BatchResult, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Duration,
}

impl ScriptedProcedure {
    pub fn new(script: Vec<Result<BatchResult, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .map(|c| RecordedCall {
                at: c.at,
                request: c.request.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl LeaderboardProcedure for ScriptedProcedure {
    async fn execute(&self, request: &BatchRequest) -> Result<BatchResult> {
        self.calls.lock().push(RecordedCall {
            at: Instant::now(),
            request: request.clone(),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(BatchResult::default()),
        }
    }
}

/// A processed batch moving the watermark from `from_id` to `new_last_event_id`.
pub fn batch(from_id: i64, to_id: i64, new_last_event_id: i64) -> BatchResult {
    let batch_count = i32::try_from(new_last_event_id - from_id).unwrap_or(i32::MAX);
    BatchResult {
        processed: true,
        from_id,
        to_id,
        new_last_event_id,
        batch_count,
        new_event_count: to_id - from_id,
        groups_count: 1,
        applied_xp: i64::from(batch_count) * 10,
    }
}

pub fn config(batch_size: i32) -> LeaderboardWorkerConfig {
    LeaderboardWorkerConfig {
        batch_size,
        ..LeaderboardWorkerConfig::default()
    }
}
