//! Directory scanning and the startup barrier.
//!
//! A scan lists one partition directory and builds a fresh [`LruIndex`]
//! ordered by file mtime. Scans run on background threads; queries wait on a
//! [`ScanLatch`] until the most recent scan has committed its results.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use super::lru_index::LruIndex;
use super::types::{CacheEntry, Partition, PARTIAL_SUFFIX};

/// One-shot gate released when a scan finishes.
#[derive(Debug, Default)]
pub struct ScanLatch {
    released: Mutex<bool>,
    cond: Condvar,
}

impl ScanLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A latch that is already open.
    pub fn released() -> Self {
        Self {
            released: Mutex::new(true),
            cond: Condvar::new(),
        }
    }

    /// Open the latch and wake all waiters.
    pub fn release(&self) {
        let mut released = self.released.lock();
        *released = true;
        self.cond.notify_all();
    }

    /// Block until the latch is open. No timeout.
    pub fn wait(&self) {
        let mut released = self.released.lock();
        while !*released {
            self.cond.wait(&mut released);
        }
    }

    pub fn is_released(&self) -> bool {
        *self.released.lock()
    }
}

/// Releases a latch when dropped, including during a panic unwind.
pub(crate) struct LatchGuard(pub(crate) Arc<ScanLatch>);

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Statistics from scanning one partition directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    /// Number of files indexed.
    pub files_indexed: u64,
    /// Number of entries skipped (directories, partial or unreadable files).
    pub skipped: u64,
    /// Total size in bytes.
    pub total_bytes: u64,
}

/// List a partition directory and build its index.
///
/// A missing or unreadable directory yields an empty index. Subdirectories,
/// partial downloads and files with non-UTF-8 names are skipped.
pub fn scan_partition(dir: &Path, partition: Partition) -> (LruIndex, ScanStats) {
    let mut stats = ScanStats::default();

    let read_dir = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) => {
            debug!(
                dir = %dir.display(),
                error = %e,
                "Failed to read cache directory during scan"
            );
            return (LruIndex::new(), stats);
        }
    };

    let mut entries = Vec::new();
    for dir_entry in read_dir.flatten() {
        let path = dir_entry.path();
        let is_partial = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(PARTIAL_SUFFIX));
        if is_partial {
            stats.skipped += 1;
            continue;
        }
        match CacheEntry::from_file(&path, partition) {
            Some(entry) => {
                stats.files_indexed += 1;
                stats.total_bytes += entry.length;
                entries.push(entry);
            }
            None => stats.skipped += 1,
        }
    }

    let index = LruIndex::from_entries(entries);

    debug!(
        partition = %partition,
        files = stats.files_indexed,
        skipped = stats.skipped,
        total_bytes = stats.total_bytes,
        "Cache partition scanned"
    );

    (index, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn create_test_file(path: &Path, size: usize, age_secs: u64) {
        std::fs::write(path, vec![0u8; size]).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(mtime)).unwrap();
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let (index, stats) = scan_partition(&temp.path().join("missing"), Partition::Media);
        assert!(index.is_empty());
        assert_eq!(stats, ScanStats::default());
    }

    #[test]
    fn test_scan_orders_by_mtime_and_sums_sizes() {
        let temp = TempDir::new().unwrap();
        create_test_file(&temp.path().join("middle"), 200, 200);
        create_test_file(&temp.path().join("newest"), 100, 100);
        create_test_file(&temp.path().join("oldest"), 300, 300);

        let (index, stats) = scan_partition(temp.path(), Partition::Thumbnails);

        assert_eq!(stats.files_indexed, 3);
        assert_eq!(stats.total_bytes, 600);
        assert_eq!(index.aggregate_size(), 600);
        let names: Vec<_> = index.oldest_first().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["oldest", "middle", "newest"]);
        assert!(index
            .oldest_first()
            .all(|e| e.partition == Partition::Thumbnails));
    }

    #[test]
    fn test_scan_skips_partial_files_and_directories() {
        let temp = TempDir::new().unwrap();
        create_test_file(&temp.path().join("complete"), 10, 10);
        create_test_file(&temp.path().join("downloading.part"), 10, 10);
        std::fs::create_dir(temp.path().join("subdir")).unwrap();

        let (index, stats) = scan_partition(temp.path(), Partition::Media);

        assert_eq!(index.len(), 1);
        assert!(index.contains("complete"));
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_latch_wait_blocks_until_release() {
        let latch = Arc::new(ScanLatch::new());
        assert!(!latch.is_released());

        let waiter = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || {
                latch.wait();
                true
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        latch.release();
        assert!(waiter.join().unwrap());
        assert!(latch.is_released());
    }

    #[test]
    fn test_released_latch_does_not_block() {
        let latch = ScanLatch::released();
        latch.wait();
        assert!(latch.is_released());
    }

    #[test]
    fn test_latch_guard_releases_on_panic() {
        let latch = Arc::new(ScanLatch::new());
        let guard_latch = Arc::clone(&latch);
        let result = thread::spawn(move || {
            let _guard = LatchGuard(guard_latch);
            panic!("scan failed");
        })
        .join();

        assert!(result.is_err());
        assert!(latch.is_released());
    }
}
