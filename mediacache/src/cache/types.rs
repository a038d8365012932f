//! Core types for the partitioned disk cache.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::SystemTime;
use thiserror::Error;

/// Suffix for files that are still being written.
///
/// Files carrying this suffix are never indexed.
pub const PARTIAL_SUFFIX: &str = ".part";

/// One of the independently budgeted cache regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    /// Small preview images.
    Thumbnails,
    /// Full-size media files.
    Media,
}

impl Partition {
    /// All partitions, in scan order.
    pub const ALL: [Partition; 2] = [Partition::Thumbnails, Partition::Media];

    /// Directory name of this partition below the cache root.
    pub fn directory_name(self) -> &'static str {
        match self {
            Partition::Thumbnails => "thumbnails",
            Partition::Media => "media",
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Partition::Thumbnails => 0,
            Partition::Media => 1,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directory_name())
    }
}

impl FromStr for Partition {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thumbnails" | "thumbnail" | "thumbs" => Ok(Partition::Thumbnails),
            "media" => Ok(Partition::Media),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown partition '{}' (expected 'thumbnails' or 'media')",
                other
            ))),
        }
    }
}

/// Normalize a file name into an index key.
///
/// Names compare case-insensitively, so `ABC` and `abc` share one entry.
pub fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Metadata for one cached file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// File name as it exists on disk.
    pub name: String,
    /// Lower-cased name used as the index key.
    pub normalized_key: String,
    /// File length in bytes.
    pub length: u64,
    /// Last write or touch time.
    pub last_modified: SystemTime,
    /// Owning partition.
    pub partition: Partition,
}

impl CacheEntry {
    /// Create an entry from explicit metadata.
    pub fn new(
        name: impl Into<String>,
        length: u64,
        last_modified: SystemTime,
        partition: Partition,
    ) -> Self {
        let name = name.into();
        Self {
            normalized_key: normalize_name(&name),
            name,
            length,
            last_modified,
            partition,
        }
    }

    /// Build an entry from a file on disk.
    ///
    /// Returns `None` if the file cannot be stat'ed, is not a regular file,
    /// or has no UTF-8 name.
    pub fn from_file(path: &Path, partition: Partition) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        let name = path.file_name()?.to_str()?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Some(Self::new(name, metadata.len(), modified, partition))
    }
}

/// A pending physical removal queued by eviction.
///
/// Equality ignores letter case in the name, matching index keys.
#[derive(Debug, Clone)]
pub struct DeletionTask {
    /// Partition holding the file.
    pub partition: Partition,
    /// File name on disk.
    pub name: String,
}

impl DeletionTask {
    pub fn new(partition: Partition, name: impl Into<String>) -> Self {
        Self {
            partition,
            name: name.into(),
        }
    }
}

impl From<&CacheEntry> for DeletionTask {
    fn from(entry: &CacheEntry) -> Self {
        Self::new(entry.partition, entry.name.clone())
    }
}

impl PartialEq for DeletionTask {
    fn eq(&self, other: &Self) -> bool {
        self.partition == other.partition && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for DeletionTask {}

/// Cache-related errors.
///
/// Best-effort operations never return these; they degrade to a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erasure stopped by cancellation
    #[error("Cache erase interrupted: removed {removed} entries, {remaining} remain")]
    Interrupted { removed: usize, remaining: usize },

    /// Invalid cache configuration
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}
