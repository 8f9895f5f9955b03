//! User store traits

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{NewUser, User, UserChanges, UserId};
use crate::domain::pagination::PageBounds;
use crate::domain::query::{SortDirection, UserFilter};
use crate::domain::DomainError;

/// Authoritative storage for users
///
/// Every call acquires and releases its own connection; nothing is held
/// between calls.
#[async_trait]
pub trait UserStore: Send + Sync + Debug {
    /// Point lookup by primary key
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Number of users matching the filter
    async fn count(&self, filter: &UserFilter) -> Result<u64, DomainError>;

    /// One page of users matching the filter, in the given order
    async fn fetch(
        &self,
        filter: &UserFilter,
        sort: SortDirection,
        bounds: PageBounds,
    ) -> Result<Vec<User>, DomainError>;

    /// Opens a transaction; failure means the store is unreachable
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, DomainError>;
}

/// A write transaction
///
/// Dropping a transaction without calling [`UserTransaction::commit`] must
/// discard its changes.
#[async_trait]
pub trait UserTransaction: Send {
    /// Inserts a user and returns the stored record with its assigned id
    async fn insert(&mut self, user: &NewUser) -> Result<User, DomainError>;

    /// Merges the changes into the row; `None` when no row has that id
    async fn update(&mut self, id: UserId, changes: &UserChanges)
        -> Result<Option<User>, DomainError>;

    /// Deletes the row; `false` when no row has that id
    async fn delete(&mut self, id: UserId) -> Result<bool, DomainError>;

    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}
