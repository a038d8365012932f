//! Cache manager coordinating the partition indexes, scanner and deletion
//! worker.
//!
//! # Locking
//!
//! Each partition index has its own mutex; the two partitions never lock
//! each other. Deletion tasks produced under a partition lock are handed to
//! the worker only after that lock is released. Every query first waits on
//! the barrier of the most recent scan.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Instant, SystemTime};

use filetime::FileTime;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::budget::{BudgetSource, PartitionWeights};
use super::config::CacheConfig;
use super::daemon::DeletionWorker;
use super::disk_eviction::evict_over_budget;
use super::lru_index::LruIndex;
use super::memory::MemoryCache;
use super::path::{DirectoryResolver, StorageProvider};
use super::r#trait::{ImageDecoder, ThumbnailDecoder};
use super::scan::{scan_partition, LatchGuard, ScanLatch};
use super::share::{purge_stale_share_files, stage_share_file, SHARE_FILE_MAX_AGE};
use super::stats::{CacheCounters, CacheStatistics};
use super::types::{
    normalize_name, CacheEntry, CacheError, DeletionTask, Partition, PARTIAL_SUFFIX,
};
use crate::key::KeyDeriver;

/// Disk-backed, size-budgeted cache for thumbnails and media files.
///
/// Cloning is not supported; share it behind an `Arc`. Dropping the manager
/// shuts down the deletion worker after it drains its queue.
pub struct CacheManager {
    inner: Arc<Inner>,
}

struct Inner {
    resolver: Arc<DirectoryResolver>,
    budget: Arc<dyn BudgetSource>,
    weights: PartitionWeights,
    trim_factor: f64,
    partitions: [Mutex<LruIndex>; 2],
    keys: KeyDeriver,
    decoder: Arc<dyn ThumbnailDecoder>,
    memory: MemoryCache,
    counters: CacheCounters,
    barrier: Mutex<Arc<ScanLatch>>,
    scan_generation: AtomicU64,
    worker: Mutex<Option<DeletionWorker>>,
}

impl CacheManager {
    /// Start the cache: spawn the deletion worker and the initial scan.
    ///
    /// Thumbnails are validated with [`ImageDecoder`].
    pub fn start(
        config: CacheConfig,
        storage: Arc<dyn StorageProvider>,
        budget: Arc<dyn BudgetSource>,
    ) -> Result<Self, CacheError> {
        Self::start_with_decoder(config, storage, budget, Arc::new(ImageDecoder))
    }

    /// Start the cache with a custom thumbnail decoder.
    pub fn start_with_decoder(
        config: CacheConfig,
        storage: Arc<dyn StorageProvider>,
        budget: Arc<dyn BudgetSource>,
        decoder: Arc<dyn ThumbnailDecoder>,
    ) -> Result<Self, CacheError> {
        config.validate()?;

        let resolver = Arc::new(DirectoryResolver::new(storage));
        let worker = DeletionWorker::start(Arc::clone(&resolver))?;

        let keys = KeyDeriver::with_options(
            config.namespaces,
            config.virtual_schemes,
            config.memo_capacity,
        );

        let inner = Arc::new(Inner {
            resolver,
            budget,
            weights: config.weights,
            trim_factor: config.trim_factor,
            partitions: [Mutex::new(LruIndex::new()), Mutex::new(LruIndex::new())],
            keys,
            decoder,
            memory: MemoryCache::new(config.memory_thumbnails),
            counters: CacheCounters::default(),
            barrier: Mutex::new(Arc::new(ScanLatch::released())),
            scan_generation: AtomicU64::new(0),
            worker: Mutex::new(Some(worker)),
        });

        info!(
            thumbnail_weight = config.weights.thumbnails,
            media_weight = config.weights.media,
            trim_factor = config.trim_factor,
            budget_bytes = inner.budget.total_bytes(),
            "Cache manager started"
        );

        Inner::begin_scan(&inner);
        Ok(Self { inner })
    }

    /// Whether the storage medium is mounted. Does not wait for a scan.
    pub fn is_available(&self) -> bool {
        self.inner.resolver.is_available()
    }

    /// Total indexed bytes across both partitions.
    pub fn current_size(&self) -> u64 {
        self.inner.await_scan();
        Partition::ALL
            .iter()
            .map(|p| self.inner.index(*p).lock().aggregate_size())
            .sum()
    }

    /// Current byte ceiling of a partition.
    pub fn ceiling(&self, partition: Partition) -> u64 {
        self.inner.ceiling(partition)
    }

    /// Derive the cache key for a resource identity.
    pub fn derive_key(&self, identity: &str) -> String {
        self.inner.keys.derive_key(identity)
    }

    /// On-disk path for `key` in a partition.
    ///
    /// With `touch`, an indexed entry becomes the most recently used one; an
    /// entry whose file has vanished is purged instead. Returns `None` when
    /// storage is unavailable.
    pub fn path(&self, partition: Partition, key: &str, touch: bool) -> Option<PathBuf> {
        self.inner.await_scan();
        let file = self.inner.resolver.resolve(partition)?.join(key);
        if touch {
            self.inner.touch_entry(partition, key, &file);
        }
        Some(file)
    }

    /// On-disk path of the media file for a resource identity.
    pub fn media_file(&self, identity: &str, touch: bool) -> Option<PathBuf> {
        let key = self.derive_key(identity);
        self.path(Partition::Media, &key, touch)
    }

    /// Whether `key` is indexed and its file still exists.
    pub fn is_cached(&self, partition: Partition, key: &str) -> bool {
        self.inner.await_scan();
        let Some(dir) = self.inner.resolver.resolve(partition) else {
            return false;
        };
        let file = dir.join(key);
        let normalized = normalize_name(key);

        let mut index = self.inner.index(partition).lock();
        if !index.contains(&normalized) {
            return false;
        }
        if file.exists() {
            return true;
        }
        index.remove(&normalized);
        self.inner.counters.record_missing();
        debug!(partition = %partition, key, "Cached file vanished, entry purged");
        false
    }

    /// Read a thumbnail from disk.
    ///
    /// A hit refreshes the entry's recency. Entries whose file is missing,
    /// unreadable or undecodable are purged and reported as a miss.
    pub fn load_thumbnail(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.await_scan();
        let inner = &self.inner;
        let Some(dir) = inner.resolver.resolve(Partition::Thumbnails) else {
            inner.counters.record_miss();
            return None;
        };
        let file = dir.join(key);
        let normalized = normalize_name(key);

        if !inner.index(Partition::Thumbnails).lock().contains(&normalized) {
            inner.counters.record_miss();
            return None;
        }

        let bytes = match std::fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                inner.purge(Partition::Thumbnails, &normalized);
                inner.counters.record_missing();
                inner.counters.record_miss();
                debug!(key, "Thumbnail file vanished, entry purged");
                return None;
            }
            Err(e) => {
                warn!(path = %file.display(), error = %e, "Failed to read cached thumbnail");
                inner.purge_corrupt(&normalized, &file);
                return None;
            }
        };

        if !inner.decoder.decode(&bytes) {
            warn!(path = %file.display(), "Cached thumbnail is corrupt, removing");
            inner.purge_corrupt(&normalized, &file);
            return None;
        }

        inner.touch_entry(Partition::Thumbnails, key, &file);
        inner.counters.record_hit();
        Some(bytes)
    }

    /// Write a thumbnail to disk and index it.
    ///
    /// The bytes go to `<key>.part` first and are renamed into place, so a
    /// failed write never leaves a truncated entry. Returns `true` if the
    /// thumbnail was stored.
    pub fn store_thumbnail(&self, key: &str, bytes: &[u8]) -> bool {
        self.inner.await_scan();
        let Some(dir) = self.inner.resolver.resolve(Partition::Thumbnails) else {
            debug!(key, "Storage unavailable, thumbnail not stored");
            return false;
        };
        let file = dir.join(key);
        let partial = dir.join(format!("{}{}", key, PARTIAL_SUFFIX));
        // Waits out an in-flight unlink of the old copy before writing.
        self.inner.retract(&DeletionTask::new(Partition::Thumbnails, key));

        let written =
            std::fs::write(&partial, bytes).and_then(|_| std::fs::rename(&partial, &file));
        if let Err(e) = written {
            warn!(path = %file.display(), error = %e, "Failed to write thumbnail");
            let _ = std::fs::remove_file(&partial);
            // The old copy is unindexed below and its queued deletion is gone.
            let _ = std::fs::remove_file(&file);
            self.inner.counters.record_write_failure();
            self.inner.validate_entry(Partition::Thumbnails, key, &file, false);
            return false;
        }

        self.inner.validate_entry(Partition::Thumbnails, key, &file, true);
        true
    }

    /// Reconcile the index with a file a downloader just finished.
    ///
    /// Only files directly inside a partition directory are considered;
    /// partial downloads and foreign paths are ignored. Any stale entry for
    /// the name is dropped, and on success the file is indexed and the
    /// partition trimmed to its budget.
    pub fn validate_downloaded_file(&self, path: &Path, success: bool) {
        self.inner.await_scan();
        let Some(partition) = self.inner.resolver.partition_of(path) else {
            debug!(path = %path.display(), "Downloaded file is outside the cache, ignoring");
            return;
        };
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        if name.ends_with(PARTIAL_SUFFIX) {
            return;
        }
        self.inner.validate_entry(partition, name, path, success);
    }

    /// Delete every indexed file of a partition, oldest first.
    ///
    /// The token is checked between files. On cancellation the files already
    /// removed stay removed, the rest stay indexed, and
    /// [`CacheError::Interrupted`] reports both counts.
    pub fn erase_all(
        &self,
        partition: Partition,
        cancel: &CancellationToken,
    ) -> Result<(), CacheError> {
        self.inner.await_scan();
        let Some(dir) = self.inner.resolver.resolve(partition) else {
            warn!(partition = %partition, "Storage unavailable, nothing erased");
            return Ok(());
        };

        let started = Instant::now();
        let mut removed = 0;
        let mut bytes = 0u64;
        {
            let mut index = self.inner.index(partition).lock();
            loop {
                if cancel.is_cancelled() {
                    let remaining = index.len();
                    info!(
                        partition = %partition,
                        removed,
                        remaining,
                        "Cache erase cancelled"
                    );
                    return Err(CacheError::Interrupted { removed, remaining });
                }
                let Some(entry) = index.pop_oldest() else {
                    break;
                };
                let file = dir.join(&entry.name);
                if let Err(e) = std::fs::remove_file(&file) {
                    if e.kind() != ErrorKind::NotFound {
                        debug!(path = %file.display(), error = %e, "Failed to erase cache file");
                    }
                }
                removed += 1;
                bytes += entry.length;
            }
        }

        if partition == Partition::Thumbnails {
            self.inner.memory.clear();
        }

        info!(
            partition = %partition,
            files = removed,
            bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cache partition erased"
        );
        Ok(())
    }

    /// Rescue a file whose deletion is queued but not yet performed.
    ///
    /// If a matching task is still queued it is withdrawn and the file is
    /// deleted on the calling thread instead. Returns `true` in that case.
    pub fn cancel_pending_deletion(&self, path: &Path) -> bool {
        let Some(partition) = self.inner.resolver.partition_of(path) else {
            return false;
        };
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !self.inner.retract(&DeletionTask::new(partition, name)) {
            return false;
        }
        if let Err(e) = std::fs::remove_file(path) {
            debug!(path = %path.display(), error = %e, "Failed to delete retracted file");
        }
        true
    }

    /// Rebuild the index after the storage medium was (re)mounted.
    ///
    /// Queries issued afterwards wait for the new scan. A scan still running
    /// from before is discarded when it finishes.
    pub fn on_storage_mounted(&self) {
        info!("Storage mounted, rescanning cache");
        Inner::begin_scan(&self.inner);
    }

    /// Block until the most recent scan has committed.
    pub fn wait_for_scan(&self) {
        self.inner.await_scan();
    }

    /// Block until the deletion worker has processed every queued task.
    pub fn wait_for_deletions(&self) {
        if let Some(worker) = self.inner.worker.lock().as_ref() {
            worker.wait_until_idle();
        }
    }

    /// Whether a thumbnail is held in the memory tier.
    pub fn is_thumbnail_cached_memory(&self, key: &str) -> bool {
        self.inner.memory.contains(key)
    }

    /// Fetch a thumbnail from the memory tier.
    pub fn load_thumbnail_memory(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.inner.memory.get(key)
    }

    /// Keep a thumbnail in the memory tier. An existing value is kept.
    pub fn store_thumbnail_memory(&self, key: &str, data: impl Into<Arc<Vec<u8>>>) {
        self.inner.memory.put(key, data.into());
    }

    /// Copy a cached file into the share area under a readable name.
    pub fn prepare_share_file(&self, source: &Path, source_name: &str) -> Option<PathBuf> {
        let dir = self.inner.resolver.share_directory()?;
        stage_share_file(&dir, source, source_name)
    }

    /// Remove share copies older than one hour.
    pub fn purge_stale_share_files(&self) -> usize {
        self.inner
            .resolver
            .share_directory()
            .map(|dir| purge_stale_share_files(&dir, SHARE_FILE_MAX_AGE))
            .unwrap_or(0)
    }

    /// Snapshot of sizes, ceilings and counters.
    pub fn statistics(&self) -> CacheStatistics {
        self.inner.await_scan();
        let mut stats = CacheStatistics::default();
        for partition in Partition::ALL {
            let (entries, size_bytes) = {
                let index = self.inner.index(partition).lock();
                (index.len(), index.aggregate_size())
            };
            let slot = stats.partition_mut(partition);
            slot.entries = entries;
            slot.size_bytes = size_bytes;
            slot.ceiling_bytes = self.inner.ceiling(partition);
        }
        stats.pending_deletions = self
            .inner
            .worker
            .lock()
            .as_ref()
            .map(|w| w.pending())
            .unwrap_or(0);
        stats.with_counters(&self.inner.counters)
    }

    /// Stop the deletion worker after it drains its queue.
    ///
    /// Evictions after shutdown still update the index but leave their
    /// files for the next scan.
    ///
    /// Retractions and submissions wait until the drain is complete.
    pub fn shutdown(&self) {
        let mut slot = self.inner.worker.lock();
        if let Some(mut worker) = slot.take() {
            worker.shutdown();
            info!("Cache manager shut down");
        }
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn index(&self, partition: Partition) -> &Mutex<LruIndex> {
        &self.partitions[partition.slot()]
    }

    fn ceiling(&self, partition: Partition) -> u64 {
        self.weights.ceiling(self.budget.total_bytes(), partition)
    }

    fn await_scan(&self) {
        let latch = self.barrier.lock().clone();
        latch.wait();
    }

    /// Install a new barrier and scan on a background thread.
    fn begin_scan(inner: &Arc<Inner>) {
        let generation = inner.scan_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latch = Arc::new(ScanLatch::new());
        *inner.barrier.lock() = Arc::clone(&latch);

        // The guard moves into the thread; if spawning fails it is dropped
        // with the closure and the barrier opens anyway.
        let guard = LatchGuard(latch);
        let scan_inner = Arc::clone(inner);
        let spawned = thread::Builder::new()
            .name("cache-scan".to_string())
            .spawn(move || {
                let _guard = guard;
                scan_inner.run_scan(generation);
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Failed to spawn cache scan thread, index left as is");
        }
    }

    fn run_scan(&self, generation: u64) {
        let started = Instant::now();

        if !self.resolver.is_available() {
            info!("Storage unavailable, cache index is empty");
        }

        let mut scanned = [LruIndex::new(), LruIndex::new()];
        let mut skipped = 0;
        for partition in Partition::ALL {
            if let Some(dir) = self.resolver.resolve(partition) {
                let (index, stats) = scan_partition(&dir, partition);
                skipped += stats.skipped;
                scanned[partition.slot()] = index;
            }
        }

        let mut tasks = dedupe_across_partitions(&mut scanned);

        for (partition, index) in Partition::ALL.into_iter().zip(scanned) {
            let mut current = self.index(partition).lock();
            if self.scan_generation.load(Ordering::SeqCst) != generation {
                debug!(generation, "Newer scan started, discarding results");
                return;
            }
            *current = index;
        }

        for partition in Partition::ALL {
            tasks.extend(self.evict(partition, &mut self.index(partition).lock()));
        }
        self.submit(tasks);

        if let Some(dir) = self.resolver.share_directory() {
            purge_stale_share_files(&dir, SHARE_FILE_MAX_AGE);
        }

        let [thumbnails, media] = Partition::ALL.map(|p| {
            let index = self.index(p).lock();
            (index.len(), index.aggregate_size())
        });
        info!(
            generation,
            thumbnails = thumbnails.0,
            thumbnail_bytes = thumbnails.1,
            media = media.0,
            media_bytes = media.1,
            skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cache scan complete"
        );
    }

    /// Run eviction on a locked index and return the resulting tasks.
    fn evict(&self, partition: Partition, index: &mut LruIndex) -> Vec<DeletionTask> {
        match evict_over_budget(partition, index, self.ceiling(partition), self.trim_factor) {
            Some(result) => {
                self.counters
                    .record_eviction(result.files_evicted(), result.bytes_freed);
                result.tasks
            }
            None => Vec::new(),
        }
    }

    fn submit(&self, tasks: Vec<DeletionTask>) {
        if tasks.is_empty() {
            return;
        }
        match self.worker.lock().as_ref() {
            Some(worker) => worker.submit(tasks),
            None => debug!(
                count = tasks.len(),
                "Deletion worker stopped, evicted files left for next scan"
            ),
        }
    }

    fn retract(&self, task: &DeletionTask) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|worker| worker.retract(task))
    }

    fn validate_entry(&self, partition: Partition, name: &str, path: &Path, success: bool) {
        let normalized = normalize_name(name);

        // On success the file on disk is the new one and a queued deletion of
        // the old copy must not remove it. A failed file keeps its deletion.
        if success && self.retract(&DeletionTask::new(partition, name)) {
            debug!(partition = %partition, name, "Retracted queued deletion for rewritten file");
        }

        let mut tasks = Vec::new();
        if success {
            for other in Partition::ALL.into_iter().filter(|p| *p != partition) {
                if let Some(entry) = self.index(other).lock().remove(&normalized) {
                    debug!(
                        partition = %other,
                        name,
                        "Name moved to another partition, removing old copy"
                    );
                    tasks.push(DeletionTask::from(&entry));
                }
            }
        }

        {
            let mut index = self.index(partition).lock();
            index.remove(&normalized);
            if success {
                match CacheEntry::from_file(path, partition) {
                    Some(entry) => {
                        debug!(
                            partition = %partition,
                            name,
                            length = entry.length,
                            "Cache entry added"
                        );
                        index.insert_or_replace(entry);
                        tasks.extend(self.evict(partition, &mut index));
                    }
                    None => debug!(path = %path.display(), "Downloaded file is not readable"),
                }
            }
        }

        self.submit(tasks);
    }

    fn touch_entry(&self, partition: Partition, key: &str, file: &Path) {
        let normalized = normalize_name(key);
        let mut index = self.index(partition).lock();
        if !index.contains(&normalized) {
            return;
        }
        let now = SystemTime::now();
        match filetime::set_file_mtime(file, FileTime::from_system_time(now)) {
            Ok(()) => {
                index.touch(&normalized, now);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                index.remove(&normalized);
                self.counters.record_missing();
                debug!(partition = %partition, key, "Cached file vanished, entry purged");
            }
            Err(e) => {
                debug!(path = %file.display(), error = %e, "Failed to update file mtime");
                index.touch(&normalized, now);
            }
        }
    }

    fn purge(&self, partition: Partition, normalized: &str) -> Option<CacheEntry> {
        self.index(partition).lock().remove(normalized)
    }

    fn purge_corrupt(&self, normalized: &str, file: &Path) {
        self.purge(Partition::Thumbnails, normalized);
        if let Err(e) = std::fs::remove_file(file) {
            debug!(path = %file.display(), error = %e, "Failed to delete corrupt thumbnail");
        }
        self.counters.record_corrupt();
        self.counters.record_miss();
    }
}

/// Keep each name in one partition, preferring media.
///
/// Returns deletion tasks for the dropped thumbnail copies.
fn dedupe_across_partitions(scanned: &mut [LruIndex; 2]) -> Vec<DeletionTask> {
    let [thumbnails, media] = scanned;
    let duplicates: Vec<String> = thumbnails
        .oldest_first()
        .filter(|entry| media.contains(&entry.normalized_key))
        .map(|entry| entry.normalized_key.clone())
        .collect();

    duplicates
        .iter()
        .filter_map(|key| thumbnails.remove(key))
        .map(|entry| DeletionTask::from(&entry))
        .collect()
}
