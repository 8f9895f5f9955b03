//! CLI module for the user directory
//!
//! Provides operator subcommands:
//! - `migrate`: apply (or revert) the schema
//! - `list`, `get`, `create`, `update`, `delete`: run one directory operation
//!   and print the result as JSON

pub mod migrate;
pub mod users;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// User directory - cache-coherent user repository
#[derive(Parser)]
#[command(name = "user-directory")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply pending schema migrations
    Migrate(migrate::MigrateArgs),

    /// List one page of users
    List(users::ListArgs),

    /// Show a single user
    Get(users::IdArgs),

    /// Create a user
    Create(users::CreateArgs),

    /// Change a user's name or status
    Update(users::UpdateArgs),

    /// Delete a user
    Delete(users::IdArgs),
}

impl Command {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = load_config()?;

        match self {
            Command::Migrate(args) => migrate::run(&config, args).await,
            Command::List(args) => users::list(&config, args).await,
            Command::Get(args) => users::get(&config, args).await,
            Command::Create(args) => users::create(&config, args).await,
            Command::Update(args) => users::update(&config, args).await,
            Command::Delete(args) => users::delete(&config, args).await,
        }
    }
}

/// Reads `.env`, loads configuration and installs logging
fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    Ok(config)
}
