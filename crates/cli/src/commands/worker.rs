//! Leaderboard worker daemon.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use lingo_xp_core::ConfigWatcher;
use lingo_xp_data::PgLeaderboardProcedure;
use lingo_xp_leaderboard_worker::LeaderboardWorker;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::CommonArgs;

#[derive(Args, Debug, Clone)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Runs the leaderboard worker until Ctrl-C, hot-reloading its config section.
///
/// # Errors
/// Returns an error if the config is invalid, the database is unreachable,
/// or the worker task fails.
pub async fn run_worker(args: WorkerArgs) -> Result<()> {
    let config = args.common.load_config()?;
    if !config.leaderboard.enabled {
        tracing::warn!("Leaderboard worker is disabled in config; ticks are skipped until enabled");
    }
    let db = super::connect(&config).await?;
    let procedure = Arc::new(PgLeaderboardProcedure::new(db.pool().clone()));

    let (watcher, mut app_rx) = ConfigWatcher::new(config.clone());
    let (leaderboard_tx, leaderboard_rx) = watch::channel(config.leaderboard.clone());
    let worker = LeaderboardWorker::with_config_updates(procedure, leaderboard_rx)?;

    let config_path = args.common.config.clone();
    let watch_task = tokio::spawn(async move {
        if let Err(e) = watcher.watch(&config_path).await {
            tracing::warn!(error = %e, path = %config_path, "Config hot reload unavailable");
        }
    });

    let cancel = CancellationToken::new();
    let forward_cancel = cancel.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                () = forward_cancel.cancelled() => break,
                changed = app_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let leaderboard = app_rx.borrow_and_update().leaderboard.clone();
                    leaderboard_tx.send_if_modified(|current| {
                        if *current == leaderboard {
                            false
                        } else {
                            *current = leaderboard;
                            true
                        }
                    });
                }
            }
        }
    });

    let handle = worker.start(cancel.clone());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Received Ctrl-C, stopping leaderboard worker");

    cancel.cancel();
    handle.stop().await?;
    forward_task.await.context("Config forwarder failed")?;
    watch_task.await.context("Config watcher failed")?;

    tracing::info!("Leaderboard worker daemon stopped");
    Ok(())
}
