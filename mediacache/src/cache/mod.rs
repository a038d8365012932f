//! Partitioned, size-budgeted disk cache for thumbnails and media.
//!
//! Provides per-partition LRU indexes reconciled with the filesystem,
//! budget-driven eviction with deferred deletion, an in-memory thumbnail
//! tier, statistics tracking and a share staging area.

mod budget;
mod config;
mod daemon;
mod disk_eviction;
mod lru_index;
mod memory;
mod path;
mod scan;
mod share;
mod stats;
mod system;
mod r#trait;
mod types;

pub use budget::{
    delete_target, BudgetSource, PartitionWeights, SharedBudget, DEFAULT_MEDIA_WEIGHT,
    DEFAULT_THUMBNAIL_WEIGHT, DEFAULT_TRIM_FACTOR,
};
pub use config::CacheConfig;
pub use daemon::DeletionWorker;
pub use disk_eviction::{evict_over_budget, EvictionResult};
pub use lru_index::LruIndex;
pub use memory::{MemoryCache, DEFAULT_MEMORY_THUMBNAILS, LOW_MEMORY_THUMBNAILS};
pub use path::{DirectoryResolver, LocalStorage, StorageProvider, SHARE_DIRECTORY};
pub use r#trait::{AcceptAll, ImageDecoder, ThumbnailDecoder};
pub use scan::{scan_partition, ScanLatch, ScanStats};
pub use share::{purge_stale_share_files, stage_share_file, SHARE_FILE_MAX_AGE};
pub use stats::{CacheStatistics, PartitionStats};
pub use system::CacheManager;
pub use types::{
    normalize_name, CacheEntry, CacheError, DeletionTask, Partition, PARTIAL_SUFFIX,
};
