//! Cache statistics tracking and reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::Partition;

/// Hot-path counters, updated without locks.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    thumbnail_hits: AtomicU64,
    thumbnail_misses: AtomicU64,
    corrupt_purged: AtomicU64,
    missing_purged: AtomicU64,
    entries_evicted: AtomicU64,
    bytes_evicted: AtomicU64,
    write_failures: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn record_hit(&self) {
        self.thumbnail_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.thumbnail_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_corrupt(&self) {
        self.corrupt_purged.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_missing(&self) {
        self.missing_purged.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self, entries: usize, bytes: u64) {
        self.entries_evicted
            .fetch_add(entries as u64, Ordering::Relaxed);
        self.bytes_evicted.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// State of one partition at snapshot time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionStats {
    /// Indexed entries
    pub entries: usize,
    /// Sum of indexed entry lengths
    pub size_bytes: u64,
    /// Current ceiling derived from the total budget
    pub ceiling_bytes: u64,
}

impl PartitionStats {
    /// Fraction of the ceiling in use (0.0 when the ceiling is zero).
    pub fn usage(&self) -> f64 {
        if self.ceiling_bytes == 0 {
            0.0
        } else {
            self.size_bytes as f64 / self.ceiling_bytes as f64
        }
    }
}

/// Point-in-time view of the cache.
#[derive(Debug, Clone, Default)]
pub struct CacheStatistics {
    pub thumbnails: PartitionStats,
    pub media: PartitionStats,
    /// Evicted files not yet unlinked
    pub pending_deletions: usize,
    pub thumbnail_hits: u64,
    pub thumbnail_misses: u64,
    /// Entries purged because their file failed to decode
    pub corrupt_purged: u64,
    /// Entries purged because their file vanished
    pub missing_purged: u64,
    pub entries_evicted: u64,
    pub bytes_evicted: u64,
    pub write_failures: u64,
}

impl CacheStatistics {
    pub(crate) fn with_counters(mut self, counters: &CacheCounters) -> Self {
        self.thumbnail_hits = counters.thumbnail_hits.load(Ordering::Relaxed);
        self.thumbnail_misses = counters.thumbnail_misses.load(Ordering::Relaxed);
        self.corrupt_purged = counters.corrupt_purged.load(Ordering::Relaxed);
        self.missing_purged = counters.missing_purged.load(Ordering::Relaxed);
        self.entries_evicted = counters.entries_evicted.load(Ordering::Relaxed);
        self.bytes_evicted = counters.bytes_evicted.load(Ordering::Relaxed);
        self.write_failures = counters.write_failures.load(Ordering::Relaxed);
        self
    }

    pub fn partition(&self, partition: Partition) -> &PartitionStats {
        match partition {
            Partition::Thumbnails => &self.thumbnails,
            Partition::Media => &self.media,
        }
    }

    pub(crate) fn partition_mut(&mut self, partition: Partition) -> &mut PartitionStats {
        match partition {
            Partition::Thumbnails => &mut self.thumbnails,
            Partition::Media => &mut self.media,
        }
    }

    /// Total indexed bytes across partitions.
    pub fn total_size(&self) -> u64 {
        self.thumbnails.size_bytes + self.media.size_bytes
    }

    /// Total indexed entries across partitions.
    pub fn total_entries(&self) -> usize {
        self.thumbnails.entries + self.media.entries
    }

    /// Thumbnail disk hit rate (0.0 to 1.0).
    pub fn thumbnail_hit_rate(&self) -> f64 {
        let total = self.thumbnail_hits + self.thumbnail_misses;
        if total == 0 {
            0.0
        } else {
            self.thumbnail_hits as f64 / total as f64
        }
    }
}
