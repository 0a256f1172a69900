use anyhow::Result;
use clap::Args;

use super::CommonArgs;

#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Applies the embedded schema migrations.
///
/// # Errors
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let config = args.common.load_config()?;
    let db = super::connect(&config).await?;

    db.migrate().await?;
    tracing::info!("Migrations applied");
    Ok(())
}
