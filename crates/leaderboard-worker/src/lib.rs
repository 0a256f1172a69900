//! Weekly leaderboard batch worker.
//!
//! A [`LeaderboardWorker`] ticks on a fixed interval. Each tick runs one
//! burst: back-to-back calls of the batch procedure until the ceiling seen by
//! the first call is reached, no work is left, or the tick's deadline expires.

pub mod burst;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use burst::{BurstController, BurstOutcome, BurstReport};
pub use scheduler::{LeaderboardWorker, WorkerHandle, WorkerState};
