//! Common helpers shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mediacache::cache::CacheManager;
use mediacache::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config file to use: the `--config` override or the default path.
pub fn resolve_config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(config_file_path)
}

/// Load the config file, falling back to defaults if it does not exist.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = resolve_config_path(path);
    ConfigFile::load_from(&path).map_err(|error| CliError::Config { path, error })
}

/// Start a cache manager for the configured directory and wait for its scan.
pub fn start_cache(config: &ConfigFile) -> Result<CacheManager, CliError> {
    let cache = CacheManager::start(
        config.cache_config(),
        Arc::new(config.storage()),
        Arc::new(config.budget()),
    )?;
    cache.wait_for_scan();
    Ok(cache)
}
