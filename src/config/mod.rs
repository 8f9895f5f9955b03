//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheSettings, DatabaseConfig, DirectorySettings, LogFormat, LoggingConfig,
    PaginationSettings, TimeoutSettings,
};
