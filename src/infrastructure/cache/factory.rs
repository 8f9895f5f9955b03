//! Backend selection for the list cache

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};

/// Where list pages are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// Process-local moka cache; pages are not shared between instances
    #[default]
    #[serde(alias = "memory")]
    InMemory,
    /// Shared Redis keyspace
    Redis,
}

impl CacheType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::InMemory => "in_memory",
            CacheType::Redis => "redis",
        }
    }
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings needed to open a list cache backend
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheType,
    /// Required when `backend` is [`CacheType::Redis`]
    pub redis_url: Option<String>,
    /// Namespace prepended to every Redis key, so several directories can
    /// share one server
    pub key_prefix: Option<String>,
    /// Lifetime of a list page; also caps how long moka retains anything
    pub page_ttl: Duration,
    /// Entry bound for the in-memory backend
    pub max_entries: Option<u64>,
    /// How long to wait for the Redis handshake
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheType::InMemory,
            redis_url: None,
            key_prefix: None,
            page_ttl: Duration::from_secs(300),
            max_entries: Some(10_000),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: CacheType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_page_ttl(mut self, ttl: Duration) -> Self {
        self.page_ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, capacity: u64) -> Self {
        self.max_entries = Some(capacity);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn in_memory_config(&self) -> InMemoryCacheConfig {
        let config = InMemoryCacheConfig::default().with_max_ttl(self.page_ttl);

        match self.max_entries {
            Some(capacity) => config.with_max_capacity(capacity),
            None => config,
        }
    }

    fn redis_config(&self) -> Result<RedisCacheConfig, DomainError> {
        let url = self.redis_url.as_deref().ok_or_else(|| {
            DomainError::configuration("cache.redis_url must be set for the redis backend")
        })?;

        let config =
            RedisCacheConfig::new(url).with_connection_timeout(self.connect_timeout);

        Ok(match &self.key_prefix {
            Some(prefix) => config.with_key_prefix(prefix.clone()),
            None => config,
        })
    }
}

/// Opens the configured backend
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Builds the cache; Redis is connected eagerly so a bad URL fails at startup
    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        let cache: Arc<dyn Cache> = match config.backend {
            CacheType::InMemory => Arc::new(InMemoryCache::with_config(config.in_memory_config())),
            CacheType::Redis => Arc::new(RedisCache::new(config.redis_config()?).await?),
        };

        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheExt;

    #[test]
    fn test_backend_deserializes_snake_case() {
        let parsed: CacheType = serde_json::from_str("\"in_memory\"").unwrap();
        assert_eq!(parsed, CacheType::InMemory);

        let alias: CacheType = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(alias, CacheType::InMemory);

        assert!(serde_json::from_str::<CacheType>("\"memcached\"").is_err());
        assert_eq!(CacheType::Redis.to_string(), "redis");
    }

    #[test]
    fn test_in_memory_retention_follows_page_ttl() {
        let config = CacheConfig::in_memory()
            .with_page_ttl(Duration::from_secs(30))
            .with_max_entries(64);

        let in_memory = config.in_memory_config();

        assert_eq!(in_memory.max_ttl, Duration::from_secs(30));
        assert_eq!(in_memory.max_capacity, 64);
    }

    #[test]
    fn test_redis_config_carries_prefix_and_timeout() {
        let config = CacheConfig::redis("redis://cache:6379")
            .with_key_prefix("directory")
            .with_connect_timeout(Duration::from_millis(750));

        let redis = config.redis_config().unwrap();

        assert_eq!(redis.url, "redis://cache:6379");
        assert_eq!(redis.key_prefix.as_deref(), Some("directory"));
        assert_eq!(redis.connection_timeout, Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_factory_create_in_memory() {
        let cache = CacheFactory::new()
            .create(&CacheConfig::in_memory().with_max_entries(100))
            .await
            .unwrap();

        cache
            .set("users_list_", &"page", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("users_list_").await.unwrap();
        assert_eq!(result, Some("page".to_string()));
    }

    #[tokio::test]
    async fn test_factory_create_redis_missing_url() {
        let config = CacheConfig {
            backend: CacheType::Redis,
            ..Default::default()
        };

        let result = CacheFactory::new().create(&config).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
