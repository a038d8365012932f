//! Index-side eviction for an over-budget partition.
//!
//! Runs under the partition lock after any size-increasing mutation. The
//! oldest entries are removed from the index immediately and returned as
//! [`DeletionTask`]s; the files themselves are unlinked later by the
//! deletion worker.
//!
//! # Batching
//!
//! Eviction does not stop at the ceiling. It frees
//! `aggregate - ceiling + trim_factor * ceiling` bytes so that a partition
//! hovering near its ceiling is not re-evicted on every insert.

use tracing::{debug, info};

use super::budget::delete_target;
use super::lru_index::LruIndex;
use super::types::{DeletionTask, Partition};

/// Result of an eviction pass.
#[derive(Debug, Clone, Default)]
pub struct EvictionResult {
    /// Files to delete, oldest first
    pub tasks: Vec<DeletionTask>,
    /// Total bytes removed from the index
    pub bytes_freed: u64,
    /// Aggregate size before eviction
    pub size_before: u64,
    /// Aggregate size after eviction
    pub size_after: u64,
}

impl EvictionResult {
    pub fn files_evicted(&self) -> usize {
        self.tasks.len()
    }
}

/// Evict oldest entries until the batching target is met.
///
/// Returns `None` if the partition is within its ceiling.
pub fn evict_over_budget(
    partition: Partition,
    index: &mut LruIndex,
    ceiling: u64,
    trim_factor: f64,
) -> Option<EvictionResult> {
    let size_before = index.aggregate_size();
    let Some(target) = delete_target(size_before, ceiling, trim_factor) else {
        debug!(
            partition = %partition,
            size_bytes = size_before,
            ceiling_bytes = ceiling,
            "Partition within budget, no eviction needed"
        );
        return None;
    };

    let mut result = EvictionResult {
        size_before,
        ..Default::default()
    };

    while result.bytes_freed < target {
        let Some(entry) = index.pop_oldest() else {
            break;
        };
        result.bytes_freed += entry.length;
        result.tasks.push(DeletionTask::from(&entry));
    }
    result.size_after = index.aggregate_size();

    info!(
        partition = %partition,
        files_evicted = result.files_evicted(),
        bytes_freed = result.bytes_freed,
        size_before = result.size_before,
        size_after = result.size_after,
        ceiling_bytes = ceiling,
        "Cache partition over budget, entries evicted"
    );

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::budget::{PartitionWeights, DEFAULT_TRIM_FACTOR};
    use crate::cache::types::CacheEntry;
    use std::time::{Duration, SystemTime};

    const MB: u64 = 1_000_000;

    fn index_of(sizes: &[u64]) -> LruIndex {
        let now = SystemTime::now();
        let entries = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| {
                // Entry 0 is the oldest.
                let age = Duration::from_secs((sizes.len() - i) as u64 * 60);
                CacheEntry::new(format!("entry{}", i), *size, now - age, Partition::Media)
            })
            .collect();
        LruIndex::from_entries(entries)
    }

    #[test]
    fn test_within_budget_evicts_nothing() {
        let mut index = index_of(&[10, 20, 30]);
        assert!(evict_over_budget(Partition::Media, &mut index, 60, DEFAULT_TRIM_FACTOR).is_none());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_evicts_oldest_until_target() {
        // 10 x 20 MB against the media ceiling of a 200 MB budget.
        let mut index = index_of(&[20 * MB; 10]);
        let ceiling = PartitionWeights::default().ceiling(200 * MB, Partition::Media);

        let result =
            evict_over_budget(Partition::Media, &mut index, ceiling, DEFAULT_TRIM_FACTOR).unwrap();

        assert_eq!(result.files_evicted(), 6);
        assert_eq!(result.bytes_freed, 120 * MB);
        assert_eq!(result.size_before, 200 * MB);
        assert_eq!(result.size_after, 80 * MB);
        assert_eq!(index.len(), 4);
        assert_eq!(index.aggregate_size(), 80 * MB);

        let evicted: Vec<_> = result.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            evicted,
            vec!["entry0", "entry1", "entry2", "entry3", "entry4", "entry5"]
        );
        assert!(result.tasks.iter().all(|t| t.partition == Partition::Media));
    }

    #[test]
    fn test_result_below_ceiling() {
        let mut index = index_of(&[7, 3, 9, 1, 12, 5, 8]);
        let ceiling = 20;
        evict_over_budget(Partition::Media, &mut index, ceiling, DEFAULT_TRIM_FACTOR).unwrap();
        assert!(index.aggregate_size() <= ceiling);
    }

    #[test]
    fn test_exhausts_entries_when_target_unreachable() {
        let mut index = index_of(&[50, 50]);
        let result = evict_over_budget(Partition::Media, &mut index, 0, DEFAULT_TRIM_FACTOR).unwrap();
        assert_eq!(result.files_evicted(), 2);
        assert!(index.is_empty());
        assert_eq!(result.size_after, 0);
    }

    #[test]
    fn test_touched_entry_is_evicted_last() {
        let mut index = index_of(&[10, 10, 10, 10]);
        index.touch("entry0", SystemTime::now());

        let result = evict_over_budget(Partition::Media, &mut index, 0, 0.0).unwrap();
        assert_eq!(result.tasks.last().unwrap().name, "entry0");
    }

    #[test]
    fn test_eviction_result_default() {
        let result = EvictionResult::default();
        assert_eq!(result.files_evicted(), 0);
        assert_eq!(result.bytes_freed, 0);
        assert_eq!(result.size_before, 0);
        assert_eq!(result.size_after, 0);
    }
}
