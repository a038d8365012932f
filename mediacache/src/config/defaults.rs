//! Default values and constants for all configuration settings.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::settings::*;
use crate::cache::{
    DEFAULT_MEDIA_WEIGHT, DEFAULT_MEMORY_THUMBNAILS, DEFAULT_THUMBNAIL_WEIGHT,
    DEFAULT_TRIM_FACTOR,
};
use crate::key::{DEFAULT_MEMO_CAPACITY, DEFAULT_VIRTUAL_SCHEME};

/// Default total disk budget (256 MB).
pub const DEFAULT_CACHE_SIZE: u64 = 256 * 1024 * 1024;

/// Directory name below the platform cache directory.
pub const CACHE_DIRECTORY_NAME: &str = "mediacache";

/// Default cache root: the platform cache directory plus `mediacache`.
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CACHE_DIRECTORY_NAME)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            keys: KeySettings::default(),
            namespaces: BTreeMap::new(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            size: DEFAULT_CACHE_SIZE,
            thumbnail_weight: DEFAULT_THUMBNAIL_WEIGHT,
            media_weight: DEFAULT_MEDIA_WEIGHT,
            trim_factor: DEFAULT_TRIM_FACTOR,
            memory_thumbnails: DEFAULT_MEMORY_THUMBNAILS,
            low_memory: false,
        }
    }
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            virtual_schemes: vec![DEFAULT_VIRTUAL_SCHEME.to_string()],
            memo_capacity: DEFAULT_MEMO_CAPACITY,
        }
    }
}
