//! Cache domain - cache abstraction and list key namespace

mod key;
mod repository;

pub use key::{glob_to_regex, ListKeyspace};
pub use repository::{Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::{CacheOp, MockCache, MockCacheStats};
