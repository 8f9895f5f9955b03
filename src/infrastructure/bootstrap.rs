//! Construction of the directory from application configuration

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::domain::cache::Cache;
use crate::domain::pagination::PaginationConfig;
use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheConfig, CacheFactory};
use crate::infrastructure::storage::{connect_pool, PostgresConfig, PostgresUserStore};
use crate::infrastructure::user::{DirectoryConfig, Timeouts, UserDirectory};

/// Handles built at startup and shared by every request
#[derive(Debug, Clone)]
pub struct Services {
    pub pool: PgPool,
    pub cache: Arc<dyn Cache>,
    pub directory: Arc<UserDirectory>,
}

pub fn postgres_config(config: &AppConfig) -> PostgresConfig {
    let db = &config.database;

    PostgresConfig::new(db.url.clone())
        .with_max_connections(db.max_connections)
        .with_min_connections(db.min_connections)
        .with_connect_timeout(db.connect_timeout_secs)
        .with_idle_timeout(db.idle_timeout_secs)
}

pub fn cache_config(config: &AppConfig) -> CacheConfig {
    let settings = &config.cache;

    CacheConfig {
        backend: settings.backend,
        redis_url: settings.redis_url.clone(),
        key_prefix: settings.key_prefix.clone(),
        page_ttl: settings.ttl(),
        max_entries: Some(settings.max_capacity),
        connect_timeout: config.timeouts.cache().max(std::time::Duration::from_secs(1)),
    }
}

pub fn directory_config(config: &AppConfig) -> DirectoryConfig {
    DirectoryConfig::default()
        .with_collection(config.directory.collection.clone())
        .with_cache_ttl(config.cache.ttl())
        .with_pagination(
            PaginationConfig::default()
                .with_default_page_size(config.pagination.default_page_size)
                .with_max_page_size(config.pagination.max_page_size),
        )
        .with_timeouts(Timeouts::new(
            config.timeouts.store(),
            config.timeouts.cache(),
        ))
        .with_post_commit_sweep(config.directory.post_commit_sweep)
}

/// Opens the database pool only
pub async fn connect_database(config: &AppConfig) -> Result<PgPool, DomainError> {
    connect_pool(&postgres_config(config)).await
}

/// Opens the pool and the cache and assembles the directory
pub async fn build_services(config: &AppConfig) -> Result<Services, DomainError> {
    let pool = connect_database(config).await?;
    tracing::info!("Connected to PostgreSQL");

    let cache = CacheFactory::new().create(&cache_config(config)).await?;
    tracing::info!(backend = %config.cache.backend, "Cache ready");

    let store = Arc::new(PostgresUserStore::new(pool.clone()));
    let directory = UserDirectory::new(store, cache.clone(), directory_config(config))?;

    Ok(Services {
        pool,
        cache,
        directory: Arc::new(directory),
    })
}
