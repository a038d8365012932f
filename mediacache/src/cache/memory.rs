//! In-memory tier for recently shown thumbnails.
//!
//! Bounded by entry count rather than bytes and independent of the disk
//! budget. Values are shared so a hit does not copy the payload.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

/// Thumbnail entries kept in memory by default.
pub const DEFAULT_MEMORY_THUMBNAILS: usize = 200;

/// Thumbnail entries kept in memory on low-memory devices.
pub const LOW_MEMORY_THUMBNAILS: usize = 50;

/// LRU of thumbnail payloads keyed by thumbnail key.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Arc<Vec<u8>>>>,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` thumbnails (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Check for a thumbnail without affecting recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains(key)
    }

    /// Fetch a thumbnail, marking it most recently used.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.lock().get(key).cloned()
    }

    /// Store a thumbnail unless one is already cached under `key`.
    ///
    /// Returns `true` if the value was inserted.
    pub fn put(&self, key: &str, data: Arc<Vec<u8>>) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains(key) {
            return false;
        }
        entries.put(key.to_string(), data);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
