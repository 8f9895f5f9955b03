//! PostgreSQL user store with connection pooling

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row, Transaction};

use crate::domain::pagination::PageBounds;
use crate::domain::query::{BindValue, SortDirection, UserFilter};
use crate::domain::user::{NewUser, User, UserChanges, UserId, UserStore, UserTransaction};
use crate::domain::DomainError;

const USER_COLUMNS: &str = "id, name, status, created_at, updated_at";

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
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

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }
}

/// Opens a connection pool
pub async fn connect_pool(config: &PostgresConfig) -> Result<PgPool, DomainError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| map_sqlx_error("Failed to connect to PostgreSQL", e))
}

/// Maps driver errors onto the domain taxonomy
///
/// Pool exhaustion and transport failures mean the store is unreachable;
/// constraint violations are conflicts; everything else is a storage error.
pub(crate) fn map_sqlx_error(context: &str, error: sqlx::Error) -> DomainError {
    match &error {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => DomainError::unavailable(format!("{}: {}", context, error)),
        sqlx::Error::Database(db)
            if db.is_unique_violation() || db.is_foreign_key_violation() =>
        {
            DomainError::conflict(format!("{}: {}", context, error))
        }
        _ => DomainError::storage(format!("{}: {}", context, error)),
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    binds: &[BindValue],
) -> Query<'q, Postgres, PgArguments> {
    for bind in binds {
        query = match bind {
            BindValue::Text(text) => query.bind(text.clone()),
            BindValue::Bool(flag) => query.bind(*flag),
        };
    }

    query
}

fn row_to_user(row: &PgRow) -> Result<User, DomainError> {
    let decode = |e: sqlx::Error| DomainError::storage(format!("Invalid user row: {}", e));

    let id: i64 = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let status: bool = row.try_get("status").map_err(decode)?;
    let created_at: chrono::DateTime<chrono::Utc> = row.try_get("created_at").map_err(decode)?;
    let updated_at: chrono::DateTime<chrono::Utc> = row.try_get("updated_at").map_err(decode)?;

    Ok(User::from_parts(
        UserId::new(id),
        name,
        status,
        created_at,
        updated_at,
    ))
}

/// PostgreSQL implementation of [`UserStore`]
///
/// Filter values are always bound as parameters; the only interpolated SQL
/// is the fixed `ORDER BY` clause chosen by [`SortDirection`].
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Create a new store with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a store with its own connection pool
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        Ok(Self::new(connect_pool(config).await?))
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to get user", e))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn count(&self, filter: &UserFilter) -> Result<u64, DomainError> {
        let fragment = filter.to_sql(1);
        let sql = format!("SELECT COUNT(*) FROM users{}", fragment.where_clause());

        let row = bind_values(sqlx::query(&sql), &fragment.binds)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count users", e))?;

        let total: i64 = row
            .try_get(0)
            .map_err(|e| DomainError::storage(format!("Invalid count row: {}", e)))?;

        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn fetch(
        &self,
        filter: &UserFilter,
        sort: SortDirection,
        bounds: PageBounds,
    ) -> Result<Vec<User>, DomainError> {
        let fragment = filter.to_sql(1);
        let limit_placeholder = fragment.next_placeholder(1);
        let sql = format!(
            "SELECT {} FROM users{} {} LIMIT ${} OFFSET ${}",
            USER_COLUMNS,
            fragment.where_clause(),
            sort.order_by_sql(),
            limit_placeholder,
            limit_placeholder + 1
        );

        let rows = bind_values(sqlx::query(&sql), &fragment.binds)
            .bind(bounds.limit_i64())
            .bind(bounds.offset_i64())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to list users", e))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn begin(&self) -> Result<Box<dyn UserTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;

        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// A database transaction; sqlx rolls it back if it is dropped uncommitted
struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PostgresTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresTransaction").finish_non_exhaustive()
    }
}

#[async_trait]
impl UserTransaction for PostgresTransaction {
    async fn insert(&mut self, user: &NewUser) -> Result<User, DomainError> {
        let sql = format!(
            "INSERT INTO users (name, status) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(user.name.as_str())
            .bind(user.effective_status())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to create user", e))?;

        row_to_user(&row)
    }

    async fn update(
        &mut self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, DomainError> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = COALESCE($1, name), status = COALESCE($2, status), updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(changes.name.clone())
            .bind(changes.status)
            .bind(id.value())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to update user", e))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn delete(&mut self, id: UserId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete user", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let this = *self;
        this.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        let this = *self;
        this.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("Failed to roll back transaction", e))
    }
}
