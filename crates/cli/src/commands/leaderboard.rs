use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Args;
use lingo_xp_core::{week_start_of, week_start_of_date};
use lingo_xp_data::PgLeaderboardRepository;

use super::CommonArgs;

#[derive(Args, Debug, Clone)]
pub struct LeaderboardArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Any date inside the week to show (YYYY-MM-DD); defaults to the current week
    #[arg(long)]
    pub week: Option<NaiveDate>,

    #[arg(long, default_value_t = 10)]
    pub limit: i64,
}

/// Prints the top entries of a week and how far the worker has folded the ledger.
///
/// # Errors
/// Returns an error if the database is unreachable or a query fails.
pub async fn run_leaderboard(args: LeaderboardArgs) -> Result<()> {
    let config = args.common.load_config()?;
    let db = super::connect(&config).await?;
    let repo = PgLeaderboardRepository::new(db.pool().clone());

    let week_start = match args.week {
        Some(day) => week_start_of_date(day),
        None => week_start_of(Utc::now()),
    };
    let entries = repo.top_for_week(week_start, args.limit).await?;
    let worker = &config.leaderboard.worker_name;
    let watermark = repo.watermark(worker).await?;
    let latest = repo.latest_event_id().await?;

    println!("Weekly leaderboard, week of {week_start}");
    println!("{:>4}  {:>14}  {:>10}", "#", "telegram_id", "xp");
    for (rank, entry) in entries.iter().enumerate() {
        println!("{:>4}  {:>14}  {:>10}", rank + 1, entry.telegram_id, entry.xp);
    }
    if entries.is_empty() {
        println!("  (no entries)");
    }

    match watermark {
        Some(id) => println!("\nWorker '{worker}': watermark {id}, latest event {latest}, lag {}", latest - id),
        None => println!("\nWorker '{worker}' has not run yet, latest event {latest}"),
    }
    Ok(())
}
