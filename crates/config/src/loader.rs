use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::SalesdeskConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "salesdesk.toml",
    "salesdesk.yaml",
    "salesdesk.yml",
    "salesdesk.json",
];

/// Environment variable overriding `api.base_url`.
pub const BASE_URL_ENV: &str = "SALESDESK_API_BASE_URL";

/// Environment variable overriding `storage.path`.
pub const SESSION_PATH_ENV: &str = "SALESDESK_SESSION_PATH";

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, config discovery only looks in
/// this directory (project-local and user-global paths are skipped).
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = Some(path);
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<SalesdeskConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load config from an explicit path, or discover it, then apply env overrides.
///
/// An explicit path that cannot be read is an error; a discovered file that
/// fails to parse falls back to defaults with a warning.
pub fn load_or_discover(path: Option<&Path>) -> anyhow::Result<SalesdeskConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./salesdesk.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/salesdesk/salesdesk.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SalesdeskConfig::default()` if no usable config file is found.
pub fn discover_and_load() -> SalesdeskConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return SalesdeskConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            SalesdeskConfig::default()
        },
    }
}

/// Apply environment overrides on top of file values.
pub fn apply_env_overrides(config: &mut SalesdeskConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
        debug!(base_url = %url, "base url overridden from environment");
        config.api.base_url = url;
    }
    if let Some(path) = lookup(SESSION_PATH_ENV).filter(|v| !v.trim().is_empty()) {
        config.storage.path = Some(PathBuf::from(path));
    }
}

/// Find the first config file in standard locations.
///
/// When a config dir override is set, only that directory is searched.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return find_in(&dir);
    }

    // Project-local
    if let Some(p) = find_in(Path::new(".")) {
        return Some(p);
    }

    // User-global: ~/.config/salesdesk/
    home_dir().and_then(|h| find_in(&h.join(".config").join("salesdesk")))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the config directory: override, or `~/.config/salesdesk/` on all platforms.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return Some(dir);
    }
    home_dir().map(|h| h.join(".config").join("salesdesk"))
}

/// Returns the data directory: `~/.salesdesk/` on all platforms.
pub fn data_dir() -> PathBuf {
    home_dir()
        .map(|h| h.join(".salesdesk"))
        .unwrap_or_else(|| PathBuf::from(".salesdesk"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("salesdesk.toml")
}

/// Lock guarding config read-modify-write cycles.
static CONFIG_SAVE_LOCK: Mutex<()> = Mutex::new(());

/// Load the current config, apply `f`, and save.
///
/// Returns the path written to.
pub fn update_config(f: impl FnOnce(&mut SalesdeskConfig)) -> anyhow::Result<PathBuf> {
    let _guard = CONFIG_SAVE_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let path = find_or_default_config_path();
    let mut config = if path.exists() {
        load_config(&path)?
    } else {
        SalesdeskConfig::default()
    };
    f(&mut config);
    write_config(&config, &path)?;
    Ok(path)
}

fn write_config(config: &SalesdeskConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let raw = match ext {
        "yaml" | "yml" => serde_yaml::to_string(config)?,
        "json" => serde_json::to_string_pretty(config)?,
        _ => toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?,
    };
    std::fs::write(path, raw)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<SalesdeskConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
