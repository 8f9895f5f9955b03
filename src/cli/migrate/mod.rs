//! Migrate command - applies or reverts the users schema

use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::bootstrap;
use crate::infrastructure::storage::{Migrator, PostgresMigrator};

/// Arguments for the migrate command
#[derive(Args, Clone, Debug)]
pub struct MigrateArgs {
    /// Revert the most recent migration instead of applying pending ones
    #[arg(long)]
    pub revert: bool,
}

/// Run the migrations
pub async fn run(config: &AppConfig, args: MigrateArgs) -> anyhow::Result<()> {
    let pool = bootstrap::connect_database(config).await?;
    let migrator = PostgresMigrator::new(pool);

    if args.revert {
        match migrator.revert().await? {
            Some(version) => info!(version, "Reverted migration"),
            None => info!("No migration to revert"),
        }
    } else {
        let applied = migrator.run().await?;
        info!(applied, "Migrations complete");
    }

    let version = migrator.version().await?;
    println!("{}", serde_json::json!({ "version": version }));

    Ok(())
}
