//! User directory facade

use std::sync::Arc;
use std::time::Duration;

use super::deadline::{within, Timeouts};
use super::list_cache::ListCache;
use super::writer::UserWriter;
use crate::domain::cache::{Cache, ListKeyspace};
use crate::domain::pagination::{Page, PaginationConfig, Paginator};
use crate::domain::query::PageRequest;
use crate::domain::user::{
    validate_changes, validate_new_user, NewUser, UserChanges, UserId, UserStore, UserView,
};
use crate::domain::DomainError;

/// Configuration for [`UserDirectory`]
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Namespace of list cache keys
    pub collection: String,
    /// Lifetime of a cached list page
    pub cache_ttl: Duration,
    pub pagination: PaginationConfig,
    pub timeouts: Timeouts,
    /// Repeat list invalidation once after each commit
    pub post_commit_sweep: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            collection: "users".to_string(),
            cache_ttl: Duration::from_secs(300),
            pagination: PaginationConfig::default(),
            timeouts: Timeouts::default(),
            post_commit_sweep: true,
        }
    }
}

impl DirectoryConfig {
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_post_commit_sweep(mut self, enabled: bool) -> Self {
        self.post_commit_sweep = enabled;
        self
    }
}

/// Cache-coherent access to users
///
/// Lists are read through the cache; point reads always go to the store.
/// Every write runs in its own transaction and clears the list namespace
/// before it commits. Share it behind an `Arc`; it holds no per-request state.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    list_cache: ListCache,
    writer: UserWriter,
    paginator: Paginator,
    timeouts: Timeouts,
}

impl UserDirectory {
    pub fn new(
        store: Arc<dyn UserStore>,
        cache: Arc<dyn Cache>,
        config: DirectoryConfig,
    ) -> Result<Self, DomainError> {
        config.pagination.validate()?;

        if config.collection.is_empty() {
            return Err(DomainError::configuration("Collection name cannot be empty"));
        }

        let list_cache = ListCache::new(
            cache,
            ListKeyspace::new(config.collection),
            config.cache_ttl,
            config.timeouts.cache,
        );
        let writer = UserWriter::new(store.clone(), list_cache.clone(), config.timeouts.store)
            .with_post_commit_sweep(config.post_commit_sweep);

        Ok(Self {
            store,
            list_cache,
            writer,
            paginator: Paginator::new(config.pagination),
            timeouts: config.timeouts,
        })
    }

    pub fn list_cache(&self) -> &ListCache {
        &self.list_cache
    }

    /// One page of users, served from the cache when possible
    #[tracing::instrument(skip_all, fields(key))]
    pub async fn list(&self, request: &PageRequest) -> Result<Page<UserView>, DomainError> {
        let key = self.list_cache.key_for(request.params());
        tracing::Span::current().record("key", key.as_str());

        if let Some(page) = self.list_cache.lookup(&key).await {
            return Ok(page);
        }

        let filter = request.filter();
        let bounds = self.paginator.bounds_for(request);

        let page = within(
            self.timeouts.store,
            "store.list",
            self.paginator
                .paginate(self.store.as_ref(), &filter, request.sort(), bounds),
        )
        .await?
        .map(UserView::from);

        self.list_cache.populate(&key, &page).await;

        Ok(page)
    }

    /// Point lookup, never cached
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn get(&self, id: UserId) -> Result<UserView, DomainError> {
        within(self.timeouts.store, "store.find", self.store.find_by_id(id))
            .await?
            .map(UserView::from)
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", id)))
    }

    #[tracing::instrument(skip_all)]
    pub async fn create(&self, user: NewUser) -> Result<UserView, DomainError> {
        validate_new_user(&user)?;

        let created = self.writer.create(user).await?;
        tracing::info!(id = %created.id(), "User created");

        Ok(created.into())
    }

    /// Applies a partial update to an existing user
    ///
    /// A missing id is reported before any transaction is opened.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn update(&self, id: UserId, changes: UserChanges) -> Result<UserView, DomainError> {
        validate_changes(&changes)?;
        self.get(id).await?;

        let updated = self.writer.update(id, changes).await?;
        tracing::info!("User updated");

        Ok(updated.into())
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn delete(&self, id: UserId) -> Result<(), DomainError> {
        self.get(id).await?;

        self.writer.delete(id).await?;
        tracing::info!("User deleted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheOp, MockCache, MockCacheStats};
    use crate::domain::pagination::PageBounds;
    use crate::domain::query::{SortDirection, UserFilter};
    use crate::domain::user::{User, UserTransaction};
    use crate::domain::ErrorClass;
    use crate::infrastructure::storage::InMemoryUserStore;
    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        store: InMemoryUserStore,
        cache: Arc<MockCache>,
        directory: UserDirectory,
    }

    fn fixture_with(cache: MockCache, config: DirectoryConfig) -> Fixture {
        let store = InMemoryUserStore::new();
        let cache = Arc::new(cache);
        let directory = UserDirectory::new(Arc::new(store.clone()), cache.clone(), config).unwrap();

        Fixture {
            store,
            cache,
            directory,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockCache::new(), test_config())
    }

    fn test_config() -> DirectoryConfig {
        DirectoryConfig::default().with_timeouts(Timeouts::new(
            Duration::from_millis(200),
            Duration::from_millis(100),
        ))
    }

    async fn seed(store: &InMemoryUserStore, active: usize) {
        for i in 0..active {
            store.seed(NewUser::new(format!("user-{:02}", i))).await;
        }
    }

    #[tokio::test]
    async fn test_second_list_is_a_cache_hit() {
        let f = fixture();
        seed(&f.store, 3).await;
        let request = PageRequest::new().with_page_size(2);

        let first = assert_ok!(f.directory.list(&request).await);
        let second = assert_ok!(f.directory.list(&request).await);

        assert_eq!(first, second);
        assert_eq!(f.cache.stats().hits, 1);
        assert_eq!(f.cache.stats().misses, 1);
        assert_eq!(f.cache.stats().sets, 1);
    }

    #[tokio::test]
    async fn test_reordered_parameters_share_an_entry() {
        let f = fixture();
        seed(&f.store, 3).await;

        let a = PageRequest::from_query("status=true&page_size=2").unwrap();
        let b = PageRequest::from_query("page_size=2&status=true").unwrap();

        f.directory.list(&a).await.unwrap();
        f.directory.list(&b).await.unwrap();

        assert_eq!(f.cache.stats().hits, 1);
        assert_eq!(f.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_parameter_gets_its_own_entry() {
        let f = fixture();
        seed(&f.store, 3).await;

        let plain = PageRequest::new();
        let tagged = PageRequest::new().with_param("tenant", "acme");

        let a = f.directory.list(&plain).await.unwrap();
        let b = f.directory.list(&tagged).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(f.cache.stats().hits, 0);
        assert_eq!(f.cache.len(), 2);
    }

    #[tokio::test]
    async fn test_twenty_five_row_scenario() {
        let f = fixture();
        seed(&f.store, 25).await;

        let page = f
            .directory
            .list(&PageRequest::new().with_page(3).with_page_size(10))
            .await
            .unwrap();

        assert_eq!(page.data.len(), 5);
        assert_eq!(page.pagination.current_page, 3);
        assert_eq!(page.pagination.page_size, 10);
        assert_eq!(page.pagination.total_items, 25);
        assert_eq!(page.pagination.total_pages, 3);

        let inactive = f
            .directory
            .list(&PageRequest::new().with_status(false))
            .await
            .unwrap();

        assert!(inactive.data.is_empty());
        assert_eq!(inactive.pagination.total_items, 0);
        assert_eq!(inactive.pagination.total_pages, 0);
    }

    #[tokio::test]
    async fn test_sort_and_search() {
        let f = fixture();
        f.store.seed(NewUser::new("Alice")).await;
        f.store.seed(NewUser::new("bob")).await;
        f.store.seed(NewUser::new("Malice")).await;

        let request = PageRequest::new()
            .with_search("ALICE")
            .with_sort(SortDirection::Asc);
        let page = f.directory.list(&request).await.unwrap();

        let names: Vec<&str> = page.data.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Malice"]);
        assert_eq!(page.pagination.total_items, 2);
    }

    #[tokio::test]
    async fn test_writes_are_visible_to_the_next_list() {
        let f = fixture();
        seed(&f.store, 2).await;
        let request = PageRequest::new().with_sort(SortDirection::Asc);

        let before = f.directory.list(&request).await.unwrap();
        assert_eq!(before.pagination.total_items, 2);

        let created = f.directory.create(NewUser::new("carol")).await.unwrap();
        let after_create = f.directory.list(&request).await.unwrap();
        assert_eq!(after_create.pagination.total_items, 3);
        assert!(after_create.data.contains(&created));

        let renamed = f
            .directory
            .update(created.id, UserChanges::new().with_name("caroline"))
            .await
            .unwrap();
        let after_update = f.directory.list(&request).await.unwrap();
        assert!(after_update.data.contains(&renamed));

        f.directory.delete(created.id).await.unwrap();
        let after_delete = f.directory.list(&request).await.unwrap();
        assert_eq!(after_delete, before);

        // Every list after a write was a miss
        assert_eq!(f.cache.stats().hits, 0);
    }

    #[tokio::test]
    async fn test_failed_invalidation_rolls_back_create() {
        let f = fixture();
        seed(&f.store, 1).await;
        let request = PageRequest::new();
        let cached = f.directory.list(&request).await.unwrap();

        f.cache.fail(CacheOp::DeletePattern);
        let err = assert_err!(f.directory.create(NewUser::new("carol")).await);

        assert_eq!(err.class(), ErrorClass::Unavailable);
        assert_eq!(f.store.len(), 1);
        assert_eq!(f.store.stats().commits, 0);
        assert_eq!(f.store.stats().rollbacks, 1);

        // The cached page is still the truth
        f.cache.recover(CacheOp::DeletePattern);
        assert_eq!(f.directory.list(&request).await.unwrap(), cached);
    }

    #[tokio::test]
    async fn test_missing_user_short_circuits_writes() {
        let f = fixture();
        seed(&f.store, 1).await;
        f.directory.list(&PageRequest::new()).await.unwrap();
        let cached_entries = f.cache.len();

        let update = f
            .directory
            .update(UserId::new(404), UserChanges::new().with_status(false))
            .await;
        let delete = f.directory.delete(UserId::new(404)).await;

        assert!(update.unwrap_err().is_not_found());
        assert!(delete.unwrap_err().is_not_found());
        assert_eq!(f.store.stats().begins, 0);
        assert_eq!(f.cache.stats().pattern_deletes, 0);
        assert_eq!(f.cache.len(), cached_entries);
    }

    #[tokio::test]
    async fn test_get_is_uncached() {
        let f = fixture();
        let alice = f.store.seed(NewUser::new("alice")).await;

        let view = f.directory.get(alice.id()).await.unwrap();
        assert_eq!(view, UserView::from(alice));
        assert!(f.cache.is_empty());
        assert_eq!(f.cache.stats(), MockCacheStats::default());

        let err = f.directory.get(UserId::new(99)).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[tokio::test]
    async fn test_cache_outage_falls_back_to_store() {
        let f = fixture_with(
            MockCache::new()
                .with_failure(CacheOp::Get)
                .with_failure(CacheOp::Set),
            test_config(),
        );
        seed(&f.store, 4).await;

        let page = f.directory.list(&PageRequest::new()).await.unwrap();

        assert_eq!(page.pagination.total_items, 4);
        assert!(f.cache.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_is_ignored() {
        let request = PageRequest::new();
        let key = ListKeyspace::new("users").key_for(request.params());
        let f = fixture_with(
            MockCache::new().with_raw_entry(&key, "[1, 2"),
            test_config(),
        );
        seed(&f.store, 2).await;

        let page = f.directory.list(&request).await.unwrap();
        assert_eq!(page.pagination.total_items, 2);

        // The broken entry was replaced by the fresh page
        let repaired = f.directory.list(&request).await.unwrap();
        assert_eq!(repaired, page);
        assert_eq!(f.cache.stats().sets, 1);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let f = fixture();
        seed(&f.store, 1).await;
        f.store.set_latency(Some(Duration::from_secs(5)));

        let err = f.directory.list(&PageRequest::new()).await.unwrap_err();

        assert!(matches!(err, DomainError::Timeout { .. }));
        assert_eq!(err.class(), ErrorClass::Unavailable);
        assert!(f.cache.is_empty());
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_io() {
        let f = fixture();

        let err = f.directory.create(NewUser::new("ab")).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Invalid);

        let err = f
            .directory
            .update(UserId::new(1), UserChanges::new())
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Invalid);

        assert_eq!(f.store.stats().begins, 0);
    }

    #[tokio::test]
    async fn test_update_merges_omitted_fields() {
        let f = fixture();
        let alice = f.store.seed(NewUser::new("alice")).await;

        let updated = f
            .directory
            .update(alice.id(), UserChanges::new().with_status(false))
            .await
            .unwrap();

        assert_eq!(updated.name, "alice");
        assert!(!updated.status);
        assert_eq!(updated.created_at, alice.created_at());
    }

    /// Store whose commits take `delay` to land
    #[derive(Debug)]
    struct SlowCommitStore {
        inner: InMemoryUserStore,
        delay: Duration,
    }

    struct SlowCommit {
        inner: Box<dyn UserTransaction>,
        delay: Duration,
    }

    #[async_trait]
    impl UserStore for SlowCommitStore {
        async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
            self.inner.find_by_id(id).await
        }

        async fn count(&self, filter: &UserFilter) -> Result<u64, DomainError> {
            self.inner.count(filter).await
        }

        async fn fetch(
            &self,
            filter: &UserFilter,
            sort: SortDirection,
            bounds: PageBounds,
        ) -> Result<Vec<User>, DomainError> {
            self.inner.fetch(filter, sort, bounds).await
        }

        async fn begin(&self) -> Result<Box<dyn UserTransaction>, DomainError> {
            let inner = self.inner.begin().await?;
            Ok(Box::new(SlowCommit {
                inner,
                delay: self.delay,
            }))
        }
    }

    #[async_trait]
    impl UserTransaction for SlowCommit {
        async fn insert(&mut self, user: &NewUser) -> Result<User, DomainError> {
            self.inner.insert(user).await
        }

        async fn update(
            &mut self,
            id: UserId,
            changes: &UserChanges,
        ) -> Result<Option<User>, DomainError> {
            self.inner.update(id, changes).await
        }

        async fn delete(&mut self, id: UserId) -> Result<bool, DomainError> {
            self.inner.delete(id).await
        }

        async fn commit(self: Box<Self>) -> Result<(), DomainError> {
            tokio::time::sleep(self.delay).await;
            self.inner.commit().await
        }

        async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
            self.inner.rollback().await
        }
    }

    /// Lists while a create sits between invalidation and commit, then
    /// returns the total reported by the first list after the write
    async fn list_after_racing_commit(post_commit_sweep: bool) -> u64 {
        let store = InMemoryUserStore::new();
        seed(&store, 1).await;
        let slow = SlowCommitStore {
            inner: store.clone(),
            delay: Duration::from_millis(150),
        };
        let directory = UserDirectory::new(
            Arc::new(slow),
            Arc::new(MockCache::new()),
            test_config().with_post_commit_sweep(post_commit_sweep),
        )
        .unwrap();
        let request = PageRequest::new();

        let writer = directory.clone();
        let write = tokio::spawn(async move { writer.create(NewUser::new("carol")).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let during = assert_ok!(directory.list(&request).await);
        assert_eq!(during.pagination.total_items, 1);

        assert_ok!(write.await.unwrap());
        assert_eq!(store.len(), 2);

        assert_ok!(directory.list(&request).await).pagination.total_items
    }

    #[tokio::test]
    async fn test_sweep_clears_page_cached_during_commit() {
        assert_eq!(list_after_racing_commit(true).await, 2);
    }

    #[tokio::test]
    async fn test_page_cached_during_commit_is_stale_without_sweep() {
        assert_eq!(list_after_racing_commit(false).await, 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        let cache: Arc<dyn Cache> = Arc::new(MockCache::new());

        let empty_collection = DirectoryConfig::default().with_collection("");
        assert!(UserDirectory::new(store.clone(), cache.clone(), empty_collection).is_err());

        let zero_page = DirectoryConfig::default()
            .with_pagination(PaginationConfig::default().with_max_page_size(0));
        assert!(UserDirectory::new(store, cache, zero_page).is_err());
    }
}
