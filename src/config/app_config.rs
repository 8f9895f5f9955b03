use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::cache::CacheType;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub cache: CacheSettings,
    pub pagination: PaginationSettings,
    pub timeouts: TimeoutSettings,
    pub directory: DirectorySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheType,
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    /// Lifetime of a cached list page
    pub ttl_secs: u64,
    /// Entry bound for the in-memory backend
    pub max_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Deadline for each store call
    pub store_ms: u64,
    /// Deadline for each cache call
    pub cache_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    /// Namespace for list cache keys
    pub collection: String,
    /// Re-run list invalidation once after each commit
    pub post_commit_sweep: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/user_directory".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheType::InMemory,
            redis_url: None,
            key_prefix: None,
            ttl_secs: 300,
            max_capacity: 10_000,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            store_ms: 5_000,
            cache_ms: 1_000,
        }
    }
}

impl TimeoutSettings {
    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    pub fn cache(&self) -> Duration {
        Duration::from_millis(self.cache_ms)
    }
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            collection: "users".to_string(),
            post_commit_sweep: true,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.cache.backend, CacheType::InMemory);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.pagination.default_page_size, 10);
        assert_eq!(config.pagination.max_page_size, 100);
        assert_eq!(config.timeouts.store(), Duration::from_secs(5));
        assert_eq!(config.timeouts.cache(), Duration::from_secs(1));
        assert_eq!(config.directory.collection, "users");
        assert!(config.directory.post_commit_sweep);
    }

    #[test]
    fn test_partial_sources_keep_defaults() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [cache]
                backend = "redis"
                redis_url = "redis://cache:6379"

                [timeouts]
                cache_ms = 250
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.cache.backend, CacheType::Redis);
        assert_eq!(config.cache.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.timeouts.cache_ms, 250);
        assert_eq!(config.timeouts.store_ms, 5_000);
        assert_eq!(config.directory.collection, "users");
    }
}
