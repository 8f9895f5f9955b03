//! User Directory
//!
//! A cache-coherent user repository:
//! - PostgreSQL store with filtered, ordered, paginated listing
//! - Read-through list cache (Redis or in-process) keyed by the query parameters
//! - Transactional writes that invalidate the list cache before committing

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::DomainError;
pub use infrastructure::user::{DirectoryConfig, UserDirectory};
