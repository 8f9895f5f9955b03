//! Read-through list cache coordination

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use super::deadline::within;
use crate::domain::cache::{Cache, CacheExt, ListKeyspace};
use crate::domain::pagination::Page;
use crate::domain::query::ListParams;
use crate::domain::user::UserView;
use crate::domain::DomainError;

const LIST_CACHE_METRIC: &str = "user_list_cache_total";

/// Owns the list key namespace and every cache call made for list pages
///
/// Reads degrade: any cache failure on lookup or populate is logged and
/// treated as a miss. Invalidation failures are returned so that a writer can
/// roll back.
#[derive(Debug, Clone)]
pub struct ListCache {
    cache: Arc<dyn Cache>,
    keyspace: ListKeyspace,
    ttl: Duration,
    timeout: Duration,
}

impl ListCache {
    pub fn new(
        cache: Arc<dyn Cache>,
        keyspace: ListKeyspace,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            cache,
            keyspace,
            ttl,
            timeout,
        }
    }

    pub fn keyspace(&self) -> &ListKeyspace {
        &self.keyspace
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key_for(&self, params: &ListParams) -> String {
        self.keyspace.key_for(params)
    }

    pub fn invalidation_pattern(&self) -> String {
        self.keyspace.invalidation_pattern()
    }

    /// Cached page for `key`, or `None` on a miss or any cache failure
    pub async fn lookup(&self, key: &str) -> Option<Page<UserView>> {
        let outcome: Result<Option<Page<UserView>>, DomainError> =
            within(self.timeout, "cache.get", self.cache.get(key)).await;

        match outcome {
            Ok(Some(page)) => {
                counter!(LIST_CACHE_METRIC, "outcome" => "hit").increment(1);
                tracing::debug!(key, "List cache hit");
                Some(page)
            }
            Ok(None) => {
                counter!(LIST_CACHE_METRIC, "outcome" => "miss").increment(1);
                tracing::debug!(key, "List cache miss");
                None
            }
            Err(e) => {
                counter!(LIST_CACHE_METRIC, "outcome" => "miss").increment(1);
                tracing::warn!(key, error = %e, "List cache lookup failed, reading from store");
                None
            }
        }
    }

    /// Stores a page under `key`; failures are logged and dropped
    pub async fn populate(&self, key: &str, page: &Page<UserView>) {
        let result = within(self.timeout, "cache.set", self.cache.set(key, page, self.ttl)).await;

        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Failed to populate list cache");
        }
    }

    /// Deletes every cached list page of the collection
    pub async fn invalidate(&self) -> Result<usize, DomainError> {
        let pattern = self.invalidation_pattern();

        let deleted = within(
            self.timeout,
            "cache.delete_pattern",
            self.cache.delete_pattern(&pattern),
        )
        .await?;

        tracing::debug!(pattern = %pattern, deleted, "Invalidated list cache");
        Ok(deleted)
    }
}
