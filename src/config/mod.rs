//! Configuration for stores and queries.

pub mod loader;

pub use loader::{
    load_config, resolve_log_path, StoreConfig, DEFAULT_LOG_PATH, LOG_PATH_ENV,
};
