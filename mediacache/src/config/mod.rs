//! Configuration for the cache and its tools.
//!
//! User settings live in an INI file (`~/.mediacache/config.ini`) and are
//! converted into a [`CacheConfig`](crate::cache::CacheConfig), a
//! [`LocalStorage`](crate::cache::LocalStorage) and a
//! [`SharedBudget`](crate::cache::SharedBudget) for the cache manager.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mediacache::cache::CacheManager;
//! use mediacache::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let cache = CacheManager::start(
//!     config.cache_config(),
//!     Arc::new(config.storage()),
//!     Arc::new(config.budget()),
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use file::{
    config_directory, config_file_path, default_cache_directory, CacheSettings, ConfigFile,
    ConfigFileError, KeySettings, CACHE_DIRECTORY_NAME, DEFAULT_CACHE_SIZE,
};
pub use size::{format_size, format_size_human, parse_size, SizeParseError};
