//! Capacity planning: turning one total budget into per-partition ceilings.
//!
//! The user configures a single total size. Each partition gets a fixed
//! integer weight and its ceiling is `total * weight / sum(weights)`.
//! Ceilings are recomputed on every eviction-triggering call so a live
//! budget change applies to the next mutation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::Partition;

/// Default share of the total budget given to thumbnails.
pub const DEFAULT_THUMBNAIL_WEIGHT: u32 = 1;

/// Default share of the total budget given to media.
pub const DEFAULT_MEDIA_WEIGHT: u32 = 2;

/// Default fraction of the ceiling evicted beyond the minimum.
pub const DEFAULT_TRIM_FACTOR: f64 = 0.3;

/// Source of the user-configured total budget in bytes.
///
/// Read on every eviction-triggering call, never cached.
pub trait BudgetSource: Send + Sync {
    fn total_bytes(&self) -> u64;
}

/// A total budget that can be changed while the cache is running.
#[derive(Debug, Clone, Default)]
pub struct SharedBudget {
    bytes: Arc<AtomicU64>,
}

impl SharedBudget {
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes: Arc::new(AtomicU64::new(bytes)),
        }
    }

    /// Replace the total budget.
    pub fn set(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::Relaxed);
    }
}

impl From<u64> for SharedBudget {
    fn from(bytes: u64) -> Self {
        Self::new(bytes)
    }
}

impl BudgetSource for SharedBudget {
    fn total_bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Fixed integer weights for the two partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionWeights {
    pub thumbnails: u32,
    pub media: u32,
}

impl Default for PartitionWeights {
    fn default() -> Self {
        Self {
            thumbnails: DEFAULT_THUMBNAIL_WEIGHT,
            media: DEFAULT_MEDIA_WEIGHT,
        }
    }
}

impl PartitionWeights {
    pub fn new(thumbnails: u32, media: u32) -> Self {
        Self { thumbnails, media }
    }

    /// Weight assigned to a partition.
    pub fn weight(&self, partition: Partition) -> u32 {
        match partition {
            Partition::Thumbnails => self.thumbnails,
            Partition::Media => self.media,
        }
    }

    /// Sum of all weights.
    pub fn total(&self) -> u64 {
        u64::from(self.thumbnails) + u64::from(self.media)
    }

    /// Absolute byte ceiling for a partition under the given total budget.
    ///
    /// Integer division rounds down. Zero total weight yields a zero ceiling.
    pub fn ceiling(&self, total_bytes: u64, partition: Partition) -> u64 {
        let sum = self.total();
        if sum == 0 {
            return 0;
        }
        let scaled = u128::from(total_bytes) * u128::from(self.weight(partition));
        (scaled / u128::from(sum)) as u64
    }
}

/// Bytes to evict from a partition holding `aggregate` bytes under `ceiling`.
///
/// Returns `None` when the partition is within budget. Otherwise the target
/// over-shoots below the ceiling by `trim_factor * ceiling` so that eviction
/// runs in batches rather than on every insert.
pub fn delete_target(aggregate: u64, ceiling: u64, trim_factor: f64) -> Option<u64> {
    if aggregate <= ceiling {
        return None;
    }
    let trim_amount = (trim_factor * ceiling as f64) as u64;
    Some(aggregate - ceiling + trim_amount)
}
