//! Configuration for salesdesk: schema, file discovery, and environment overrides.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        BASE_URL_ENV, SESSION_PATH_ENV, apply_env_overrides, config_dir, data_dir,
        discover_and_load, find_or_default_config_path, load_config, load_or_discover,
        set_config_dir, update_config,
    },
    schema::{ApiConfig, CacheConfig, DEFAULT_BASE_URL, SalesdeskConfig, StorageConfig},
};
