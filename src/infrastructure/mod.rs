//! Infrastructure layer - store, cache and wiring implementations

pub mod bootstrap;
pub mod cache;
pub mod logging;
pub mod storage;
pub mod user;
