//! Storage infrastructure - user store implementations

mod in_memory;
pub mod migrations;
mod postgres;

pub use in_memory::{InMemoryUserStore, TransactionStats};
pub use migrations::{user_migrations, Migration, Migrator, PostgresMigrator};
pub use postgres::{connect_pool, PostgresConfig, PostgresUserStore};
