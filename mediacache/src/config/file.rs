//! Configuration file handling for ~/.mediacache/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use super::defaults::*;
pub use super::settings::*;

use crate::cache::{CacheConfig, LocalStorage, SharedBudget};
use crate::key::HostNamespaces;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.mediacache/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Write a default config file at `path` unless one exists.
    pub fn ensure_exists(path: &Path) -> Result<(), ConfigFileError> {
        if !path.exists() {
            Self::default().save_to(path)?;
        }
        Ok(())
    }

    /// Cache tunables derived from these settings.
    pub fn cache_config(&self) -> CacheConfig {
        let namespaces: HostNamespaces = self
            .namespaces
            .iter()
            .map(|(host, namespace)| (host.clone(), namespace.clone()))
            .collect();

        let config = CacheConfig::new()
            .with_weights(self.cache.thumbnail_weight, self.cache.media_weight)
            .with_trim_factor(self.cache.trim_factor)
            .with_memory_thumbnails(self.cache.memory_thumbnails)
            .with_virtual_schemes(self.keys.virtual_schemes.clone())
            .with_memo_capacity(self.keys.memo_capacity)
            .with_namespaces(namespaces);

        if self.cache.low_memory {
            config.low_memory()
        } else {
            config
        }
    }

    /// Storage rooted at the configured cache directory.
    pub fn storage(&self) -> LocalStorage {
        LocalStorage::new(&self.cache.directory)
    }

    /// Live budget initialized to the configured size.
    pub fn budget(&self) -> SharedBudget {
        SharedBudget::new(self.cache.size)
    }
}

/// Get the path to the config directory (~/.mediacache).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mediacache")
}

/// Get the path to the config file (~/.mediacache/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
