//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Cache location, budget and tuning
    pub cache: CacheSettings,
    /// Key derivation settings
    pub keys: KeySettings,
    /// Host → namespace pairs from `[namespaces]`
    pub namespaces: BTreeMap<String, String>,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Cache root directory
    pub directory: PathBuf,
    /// Total disk budget in bytes, shared by both partitions
    pub size: u64,
    /// Budget weight of the thumbnails partition
    pub thumbnail_weight: u32,
    /// Budget weight of the media partition
    pub media_weight: u32,
    /// Extra fraction of the ceiling freed per eviction pass
    pub trim_factor: f64,
    /// Thumbnails kept in memory
    pub memory_thumbnails: usize,
    /// Use the reduced memory tier regardless of `memory_thumbnails`
    pub low_memory: bool,
}

/// Key derivation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySettings {
    /// Schemes whose identities are hashed verbatim
    pub virtual_schemes: Vec<String>,
    /// Capacity of the identity → key memo
    pub memo_capacity: usize,
}
