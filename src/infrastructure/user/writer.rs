//! Transactional writes with list cache invalidation

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use super::deadline::within;
use super::list_cache::ListCache;
use crate::domain::user::{NewUser, User, UserChanges, UserId, UserStore, UserTransaction};
use crate::domain::DomainError;

const WRITES_METRIC: &str = "user_writes_total";

/// A single row mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert(NewUser),
    Update(UserId, UserChanges),
    Delete(UserId),
}

impl Mutation {
    pub fn op(&self) -> &'static str {
        match self {
            Mutation::Insert(_) => "create",
            Mutation::Update(..) => "update",
            Mutation::Delete(_) => "delete",
        }
    }
}

/// Row state after a mutation; `None` for deletions
pub type Applied = Option<User>;

/// Runs one mutation per transaction
///
/// The sequence is begin, mutate, invalidate, commit. An error in mutate or
/// invalidate rolls the transaction back explicitly, and a transaction that
/// is dropped mid-flight rolls back on drop, so nothing is committed unless
/// the list cache was cleared first.
#[derive(Debug, Clone)]
pub struct UserWriter {
    store: Arc<dyn UserStore>,
    list_cache: ListCache,
    store_timeout: Duration,
    post_commit_sweep: bool,
}

impl UserWriter {
    pub fn new(store: Arc<dyn UserStore>, list_cache: ListCache, store_timeout: Duration) -> Self {
        Self {
            store,
            list_cache,
            store_timeout,
            post_commit_sweep: true,
        }
    }

    /// Enables or disables the invalidation repeated after each commit
    pub fn with_post_commit_sweep(mut self, enabled: bool) -> Self {
        self.post_commit_sweep = enabled;
        self
    }

    pub async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        self.apply(Mutation::Insert(user))
            .await?
            .ok_or_else(|| DomainError::internal("Insert returned no row"))
    }

    pub async fn update(&self, id: UserId, changes: UserChanges) -> Result<User, DomainError> {
        self.apply(Mutation::Update(id, changes))
            .await?
            .ok_or_else(|| DomainError::internal("Update returned no row"))
    }

    pub async fn delete(&self, id: UserId) -> Result<(), DomainError> {
        self.apply(Mutation::Delete(id)).await.map(|_| ())
    }

    /// Executes `mutation` in its own transaction
    pub async fn apply(&self, mutation: Mutation) -> Result<Applied, DomainError> {
        let op = mutation.op();

        let mut tx = within(self.store_timeout, "store.begin", self.store.begin())
            .await
            .map_err(|e| {
                tracing::warn!(op, error = %e, "Could not begin transaction");
                e
            })?;

        let outcome = self.mutate_and_invalidate(tx.as_mut(), &mutation).await;

        match outcome {
            Ok(applied) => {
                within(self.store_timeout, "store.commit", tx.commit())
                    .await
                    .map_err(|e| {
                        record(op, "commit_failed");
                        tracing::warn!(op, error = %e, "Commit failed");
                        e
                    })?;

                record(op, "committed");
                self.sweep(op).await;

                Ok(applied)
            }
            Err(cause) => {
                let rollback = within(self.store_timeout, "store.rollback", tx.rollback()).await;

                if let Err(e) = rollback {
                    tracing::warn!(op, error = %e, "Explicit rollback failed");
                }

                record(op, "rolled_back");
                tracing::warn!(op, error = %cause, "Write rolled back");

                Err(cause)
            }
        }
    }

    async fn mutate_and_invalidate(
        &self,
        tx: &mut dyn UserTransaction,
        mutation: &Mutation,
    ) -> Result<Applied, DomainError> {
        let applied = within(self.store_timeout, "store.mutate", mutate(tx, mutation)).await?;

        self.list_cache.invalidate().await?;

        Ok(applied)
    }

    /// Clears pages repopulated between invalidation and commit
    async fn sweep(&self, op: &'static str) {
        if !self.post_commit_sweep {
            return;
        }

        if let Err(e) = self.list_cache.invalidate().await {
            tracing::warn!(op, error = %e, "Post-commit list cache sweep failed");
        }
    }
}

async fn mutate(
    tx: &mut dyn UserTransaction,
    mutation: &Mutation,
) -> Result<Applied, DomainError> {
    match mutation {
        Mutation::Insert(user) => tx.insert(user).await.map(Some),
        Mutation::Update(id, changes) => match tx.update(*id, changes).await? {
            Some(user) => Ok(Some(user)),
            None => Err(DomainError::not_found(format!("User '{}' not found", id))),
        },
        Mutation::Delete(id) => {
            if tx.delete(*id).await? {
                Ok(None)
            } else {
                Err(DomainError::not_found(format!("User '{}' not found", id)))
            }
        }
    }
}

fn record(op: &'static str, outcome: &'static str) {
    counter!(WRITES_METRIC, "op" => op, "outcome" => outcome).increment(1);
}
