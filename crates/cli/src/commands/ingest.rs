//! One-off ingestion of a single XP event.

use anyhow::{Context, Result};
use clap::Args;
use lingo_xp_core::ActionCounters;
use lingo_xp_data::{
    PgAchievementRepository, PgEventTypeRepository, PgInternalCurrencyRepository,
    PgLevelRepository, PgNotificationRepository, PgNotifyBus, PgPresenceCache, PgUnitOfWork,
    PgUserRepository, PgUserStatsRepository, PgXpEventRepository,
};
use lingo_xp_progression::EventIngestionOrchestrator;

use super::CommonArgs;

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long)]
    pub telegram_id: i64,

    /// Event type name (e.g., "mini_game_completed")
    #[arg(long)]
    pub event_type: String,

    #[arg(long, default_value_t = 0)]
    pub words_learned: i64,

    #[arg(long, default_value_t = 0)]
    pub tasks_completed: i64,

    #[arg(long, default_value_t = 0)]
    pub mini_games_played: i64,
}

/// Runs one event through the ingestion orchestrator and prints the outcome as JSON.
///
/// # Errors
/// Returns an error if the database is unreachable or the ingestion is rejected.
pub async fn run_ingest(args: IngestArgs) -> Result<()> {
    let config = args.common.load_config()?;
    let db = super::connect(&config).await?;
    let pool = db.pool().clone();

    let orchestrator = EventIngestionOrchestrator::builder(PgUnitOfWork::new(pool.clone()))
        .users(PgUserRepository::new())
        .user_stats(PgUserStatsRepository::new())
        .event_types(PgEventTypeRepository::new())
        .xp_events(PgXpEventRepository::new())
        .levels(PgLevelRepository::new())
        .currency(PgInternalCurrencyRepository::new())
        .achievements(PgAchievementRepository::new())
        .notifications(PgNotificationRepository::new())
        .presence(PgPresenceCache::new(pool.clone(), &config.presence))
        .message_bus(PgNotifyBus::new(pool))
        .build()?;

    let counters = ActionCounters {
        words_learned: args.words_learned,
        tasks_completed: args.tasks_completed,
        mini_games_played: args.mini_games_played,
    };
    let outcome = orchestrator
        .execute(args.telegram_id, &args.event_type, &counters)
        .await
        .with_context(|| {
            format!(
                "Ingestion of '{}' for user {} failed",
                args.event_type, args.telegram_id
            )
        })?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
