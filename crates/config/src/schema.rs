/// Config schema types (api endpoint, session storage, reference cache).
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Base URL used when neither the environment nor a config file sets one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesdeskConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
}

/// Where the REST API lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL all endpoints are resolved against, e.g. `https://sales.example.com/api`.
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

impl ApiConfig {
    /// The base URL without trailing slashes, ready for `{base}/{path}` joins.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Session storage settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Override the session file. Defaults to `~/.salesdesk/session.json`.
    pub path: Option<PathBuf>,
}

/// Reference-data cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve reference lists from the session store when present.
    pub enabled: bool,

    /// Fetch reference lists right after a successful login.
    pub prefetch_on_login: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefetch_on_login: true,
        }
    }
}
