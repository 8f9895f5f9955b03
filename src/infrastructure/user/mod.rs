//! User directory infrastructure
//!
//! Wires the store, the list cache and the transactional writer into the
//! [`UserDirectory`] facade.

mod deadline;
mod directory;
mod list_cache;
mod writer;

pub use deadline::Timeouts;
pub use directory::{DirectoryConfig, UserDirectory};
pub use list_cache::ListCache;
pub use writer::{Applied, Mutation, UserWriter};
