//! Domain layer - entities, query building, pagination and cache abstractions

pub mod cache;
pub mod error;
pub mod pagination;
pub mod query;
pub mod user;

pub use cache::{Cache, CacheExt, ListKeyspace};
pub use error::{DomainError, ErrorClass};
pub use pagination::{Page, PageBounds, PaginationConfig, PaginationMeta, Paginator};
pub use query::{ListParams, PageRequest, SortDirection, UserFilter};
pub use user::{NewUser, User, UserChanges, UserId, UserStore, UserTransaction, UserView};
