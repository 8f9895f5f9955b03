//! Per-call deadlines for store and cache access

use std::future::Future;
use std::time::Duration;

use crate::domain::DomainError;

/// Deadlines applied to every individual store and cache call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub store: Duration,
    pub cache: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(5),
            cache: Duration::from_secs(1),
        }
    }
}

impl Timeouts {
    pub fn new(store: Duration, cache: Duration) -> Self {
        Self { store, cache }
    }
}

/// Runs `future` under `limit`, reporting a miss as [`DomainError::Timeout`]
pub(crate) async fn within<T, F>(
    limit: Duration,
    operation: &'static str,
    future: F,
) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::timeout(operation, limit.as_millis() as u64)),
    }
}
