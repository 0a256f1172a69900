use clap::{Parser, Subcommand};

mod commands;

use commands::{IngestArgs, LeaderboardArgs, MigrateArgs, WorkerArgs};

#[derive(Parser)]
#[command(name = "lingo-xp")]
#[command(about = "XP progression and weekly leaderboard tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate(MigrateArgs),
    /// Run the weekly leaderboard worker until Ctrl-C
    Worker(WorkerArgs),
    /// Ingest a single XP event for a user
    Ingest(IngestArgs),
    /// Show the weekly leaderboard and the worker watermark
    Leaderboard(LeaderboardArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Migrate(args) => commands::run_migrate(args).await?,
        Commands::Worker(args) => commands::run_worker(args).await?,
        Commands::Ingest(args) => commands::run_ingest(args).await?,
        Commands::Leaderboard(args) => commands::run_leaderboard(args).await?,
    }

    Ok(())
}
