//! In-memory user store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::pagination::PageBounds;
use crate::domain::query::{SortDirection, UserFilter};
use crate::domain::user::{NewUser, User, UserChanges, UserId, UserStore, UserTransaction};
use crate::domain::DomainError;

/// Transaction lifecycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

#[derive(Debug, Default)]
struct Shared {
    users: RwLock<BTreeMap<i64, User>>,
    /// Last assigned id; like a database sequence it never goes back on rollback
    sequence: Mutex<i64>,
    stats: Mutex<TransactionStats>,
    fail_begin: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl Shared {
    fn next_id(&self) -> Result<UserId, DomainError> {
        let mut sequence = self
            .sequence
            .lock()
            .map_err(|e| DomainError::storage(format!("Failed to acquire sequence lock: {}", e)))?;
        *sequence += 1;
        Ok(UserId::new(*sequence))
    }

    fn record(&self, update: impl FnOnce(&mut TransactionStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }

    async fn simulate_latency(&self) {
        let latency = self.latency.lock().ok().and_then(|l| *l);

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Thread-safe in-memory user store
///
/// Useful for testing and development. Data is lost when the process
/// terminates. Transactions stage their writes privately and publish them
/// only on commit, so a dropped or rolled back transaction leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    shared: Arc<Shared>,
}

impl InMemoryUserStore {
    /// Creates a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a committed user directly, bypassing transactions
    pub async fn seed(&self, user: NewUser) -> User {
        let now = Utc::now();
        let id = self.shared.next_id().unwrap_or_else(|_| UserId::new(0));
        let stored = User::from_parts(id, user.name.clone(), user.effective_status(), now, now);

        if let Ok(mut users) = self.shared.users.write() {
            users.insert(id.value(), stored.clone());
        }

        stored
    }

    /// All committed users ordered by id
    pub fn snapshot(&self) -> Vec<User> {
        self.shared
            .users
            .read()
            .map(|users| users.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of committed users
    pub fn len(&self) -> usize {
        self.shared.users.read().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> TransactionStats {
        self.shared.stats.lock().map(|s| *s).unwrap_or_default()
    }

    /// Makes `begin` report the store as unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.fail_begin.store(unavailable, Ordering::SeqCst);
    }

    /// Delays every read by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut current) = self.shared.latency.lock() {
            *current = latency;
        }
    }

    fn read_users(&self) -> Result<RwLockReadGuard<'_, BTreeMap<i64, User>>, DomainError> {
        self.shared
            .users
            .read()
            .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        self.shared.simulate_latency().await;

        let users = self.read_users()?;
        Ok(users.get(&id.value()).cloned())
    }

    async fn count(&self, filter: &UserFilter) -> Result<u64, DomainError> {
        self.shared.simulate_latency().await;

        let users = self.read_users()?;
        Ok(users.values().filter(|u| filter.matches(u)).count() as u64)
    }

    async fn fetch(
        &self,
        filter: &UserFilter,
        sort: SortDirection,
        bounds: PageBounds,
    ) -> Result<Vec<User>, DomainError> {
        self.shared.simulate_latency().await;

        let users = self.read_users()?;
        let offset = usize::try_from(bounds.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(bounds.limit).unwrap_or(usize::MAX);
        let matching = users.values().filter(|u| filter.matches(u));

        let page = match sort {
            SortDirection::Asc => matching.skip(offset).take(limit).cloned().collect(),
            SortDirection::Desc => matching.rev().skip(offset).take(limit).cloned().collect(),
        };

        Ok(page)
    }

    async fn begin(&self) -> Result<Box<dyn UserTransaction>, DomainError> {
        if self.shared.fail_begin.load(Ordering::SeqCst) {
            return Err(DomainError::unavailable("In-memory store marked unavailable"));
        }

        self.shared.record(|s| s.begins += 1);

        Ok(Box::new(InMemoryTransaction {
            shared: Arc::clone(&self.shared),
            staged: BTreeMap::new(),
            finished: false,
        }))
    }
}

/// Write transaction over [`InMemoryUserStore`]
///
/// `staged` maps ids to their pending state; `None` marks a deletion.
#[derive(Debug)]
struct InMemoryTransaction {
    shared: Arc<Shared>,
    staged: BTreeMap<i64, Option<User>>,
    finished: bool,
}

impl InMemoryTransaction {
    fn visible(&self, id: UserId) -> Result<Option<User>, DomainError> {
        if let Some(pending) = self.staged.get(&id.value()) {
            return Ok(pending.clone());
        }

        let users = self
            .shared
            .users
            .read()
            .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(users.get(&id.value()).cloned())
    }
}

#[async_trait]
impl UserTransaction for InMemoryTransaction {
    async fn insert(&mut self, user: &NewUser) -> Result<User, DomainError> {
        let now = Utc::now();
        let id = self.shared.next_id()?;
        let stored = User::from_parts(id, user.name.clone(), user.effective_status(), now, now);

        self.staged.insert(id.value(), Some(stored.clone()));
        Ok(stored)
    }

    async fn update(
        &mut self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, DomainError> {
        let Some(mut user) = self.visible(id)? else {
            return Ok(None);
        };

        user.merge(changes, Utc::now());
        self.staged.insert(id.value(), Some(user.clone()));

        Ok(Some(user))
    }

    async fn delete(&mut self, id: UserId) -> Result<bool, DomainError> {
        if self.visible(id)?.is_none() {
            return Ok(false);
        }

        self.staged.insert(id.value(), None);
        Ok(true)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DomainError> {
        {
            let mut users = self.shared.users.write().map_err(|e| {
                DomainError::storage(format!("Failed to acquire write lock: {}", e))
            })?;

            for (id, pending) in std::mem::take(&mut self.staged) {
                match pending {
                    Some(user) => users.insert(id, user),
                    None => users.remove(&id),
                };
            }
        }

        self.finished = true;
        self.shared.record(|s| s.commits += 1);

        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), DomainError> {
        self.staged.clear();
        self.finished = true;
        self.shared.record(|s| s.rollbacks += 1);

        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.shared.record(|s| s.rollbacks += 1);
        }
    }
}
