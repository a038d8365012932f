//! mediacache - Persistent, size-budgeted media cache
//!
//! This library keeps thumbnails and media files on disk under a single
//! user-configured budget, split between two partitions by fixed weights.
//! An in-memory index mirrors each partition in recency order; eviction
//! removes the oldest entries from the index immediately and leaves the
//! physical deletion to a background worker.
//!
//! # High-Level API
//!
//! ```no_run
//! use std::sync::Arc;
//! use mediacache::cache::{CacheConfig, CacheManager, LocalStorage, Partition, SharedBudget};
//!
//! let cache = CacheManager::start(
//!     CacheConfig::default(),
//!     Arc::new(LocalStorage::new("/var/cache/mediacache")),
//!     Arc::new(SharedBudget::new(256 * 1024 * 1024)),
//! )?;
//!
//! let key = cache.derive_key("https://images.example.org/src/1.jpg");
//! if cache.load_thumbnail(&key).is_none() {
//!     // fetch, then:
//!     cache.store_thumbnail(&key, b"...");
//! }
//! let media = cache.media_file("https://images.example.org/src/1.webm", true);
//! # let _ = (media, Partition::Media);
//! # Ok::<(), mediacache::cache::CacheError>(())
//! ```

pub mod cache;
pub mod config;
pub mod key;
pub mod logging;

/// Version of the mediacache library and CLI.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
