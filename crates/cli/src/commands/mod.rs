//! CLI commands for XP progression.

pub mod ingest;
pub mod leaderboard;
pub mod migrate;
pub mod worker;

pub use ingest::{run_ingest, IngestArgs};
pub use leaderboard::{run_leaderboard, LeaderboardArgs};
pub use migrate::{run_migrate, MigrateArgs};
pub use worker::{run_worker, WorkerArgs};

use anyhow::{Context, Result};
use clap::Args;
use lingo_xp_core::{AppConfig, ConfigLoader, DEFAULT_CONFIG_PATH};
use lingo_xp_data::DatabaseClient;

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Optional profile overlay (loads Config.<profile>.toml next to the config file)
    #[arg(long, env = "APP_PROFILE")]
    pub profile: Option<String>,
}

impl CommonArgs {
    /// Loads the layered configuration.
    ///
    /// # Errors
    /// Returns an error if a config file cannot be parsed.
    pub fn load_config(&self) -> Result<AppConfig> {
        let config = match &self.profile {
            Some(profile) => ConfigLoader::load_with_profile(&self.config, profile),
            None => ConfigLoader::load_from(&self.config),
        };
        config.with_context(|| format!("Failed to load config from {}", self.config))
    }
}

async fn connect(config: &AppConfig) -> Result<DatabaseClient> {
    DatabaseClient::new(&config.database)
        .await
        .context("Failed to connect to database")
}
