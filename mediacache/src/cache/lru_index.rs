//! Recency-ordered index for one cache partition.
//!
//! The index maps normalized file names to [`CacheEntry`] metadata and keeps
//! them in recency order, oldest first for eviction. It also tracks the
//! aggregate length of all indexed entries.
//!
//! # Invariant
//!
//! `aggregate_size() == Σ entry.length` after every method returns. The
//! index itself is not synchronized; each partition wraps it in a mutex.
//!
//! # Ordering
//!
//! Backed by an unbounded [`lru::LruCache`] (hash map plus intrusive list), so
//! insert, touch and removal of the oldest entry are all O(1). Entries are
//! expected to be inserted in ascending `last_modified` order; the scanner
//! sorts by mtime before populating, and live inserts and touches use the
//! current time.

use std::time::SystemTime;

use lru::LruCache;

use super::types::CacheEntry;

/// Ordered map from normalized key to entry, plus aggregate size.
pub struct LruIndex {
    entries: LruCache<String, CacheEntry>,
    aggregate_size: u64,
}

impl Default for LruIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl LruIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
            aggregate_size: 0,
        }
    }

    /// Build an index from scanned entries.
    ///
    /// Entries are sorted by `last_modified` so the oldest file is evicted
    /// first. Later duplicates of the same normalized key replace earlier ones.
    pub fn from_entries(mut entries: Vec<CacheEntry>) -> Self {
        entries.sort_by_key(|entry| entry.last_modified);
        let mut index = Self::new();
        for entry in entries {
            index.insert_or_replace(entry);
        }
        index
    }

    /// Insert an entry as the newest, replacing any entry with the same key.
    ///
    /// Returns the replaced entry, if any.
    pub fn insert_or_replace(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        let stale = self.remove(&entry.normalized_key);
        self.aggregate_size += entry.length;
        self.entries.put(entry.normalized_key.clone(), entry);
        stale
    }

    /// Refresh an entry's timestamp and move it to the newest position.
    ///
    /// Returns `false` if the key isn't indexed.
    pub fn touch(&mut self, key: &str, now: SystemTime) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_modified = now;
                true
            }
            None => false,
        }
    }

    /// Remove an entry and subtract its length.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.aggregate_size = self.aggregate_size.saturating_sub(entry.length);
        Some(entry)
    }

    /// Remove and return the oldest entry.
    pub fn pop_oldest(&mut self) -> Option<CacheEntry> {
        let (_, entry) = self.entries.pop_lru()?;
        self.aggregate_size = self.aggregate_size.saturating_sub(entry.length);
        Some(entry)
    }

    /// Iterate entries from oldest to newest without reordering.
    pub fn oldest_first(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter().rev().map(|(_, entry)| entry)
    }

    /// Look up an entry without affecting recency.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.peek(key)
    }

    /// Check if a key is indexed.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Total length of all indexed entries.
    pub fn aggregate_size(&self) -> u64 {
        self.aggregate_size
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.aggregate_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::types::Partition;
    use std::time::Duration;

    fn entry(name: &str, length: u64, age_secs: u64) -> CacheEntry {
        CacheEntry::new(
            name,
            length,
            SystemTime::now() - Duration::from_secs(age_secs),
            Partition::Media,
        )
    }

    fn sum_of_entries(index: &LruIndex) -> u64 {
        index.oldest_first().map(|e| e.length).sum()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Basic operations
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn insert_updates_aggregate_size() {
        let mut index = LruIndex::new();
        assert_eq!(index.aggregate_size(), 0);
        assert!(index.is_empty());

        index.insert_or_replace(entry("a", 1000, 10));
        index.insert_or_replace(entry("b", 2000, 5));

        assert_eq!(index.aggregate_size(), 3000);
        assert_eq!(index.len(), 2);
        assert_eq!(sum_of_entries(&index), 3000);
    }

    #[test]
    fn insert_replaces_stale_entry_with_same_key() {
        let mut index = LruIndex::new();
        index.insert_or_replace(entry("ABC", 1000, 10));

        let stale = index.insert_or_replace(entry("abc", 400, 0));

        assert_eq!(stale.map(|e| e.length), Some(1000));
        assert_eq!(index.len(), 1);
        assert_eq!(index.aggregate_size(), 400);
        assert_eq!(index.get("abc").unwrap().name, "abc");
    }

    #[test]
    fn remove_subtracts_length() {
        let mut index = LruIndex::new();
        index.insert_or_replace(entry("a", 1000, 10));
        index.insert_or_replace(entry("b", 500, 5));

        let removed = index.remove("a").unwrap();
        assert_eq!(removed.length, 1000);
        assert_eq!(index.aggregate_size(), 500);
        assert!(index.remove("a").is_none());
        assert_eq!(index.aggregate_size(), 500);
    }

    #[test]
    fn clear_resets_everything() {
        let mut index = LruIndex::new();
        index.insert_or_replace(entry("a", 1000, 10));
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.aggregate_size(), 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ordering
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn from_entries_sorts_oldest_first() {
        let index = LruIndex::from_entries(vec![
            entry("newest", 1, 10),
            entry("oldest", 1, 300),
            entry("middle", 1, 100),
        ]);

        let names: Vec<_> = index.oldest_first().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["oldest", "middle", "newest"]);
        assert_eq!(index.aggregate_size(), 3);
    }

    #[test]
    fn touch_moves_entry_to_newest_position() {
        let mut index =
            LruIndex::from_entries(vec![entry("a", 1, 30), entry("b", 1, 20), entry("c", 1, 10)]);

        let now = SystemTime::now();
        assert!(index.touch("a", now));

        let names: Vec<_> = index.oldest_first().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(index.get("a").unwrap().last_modified, now);
    }

    #[test]
    fn touch_missing_key_is_noop() {
        let mut index = LruIndex::new();
        assert!(!index.touch("missing", SystemTime::now()));
    }

    #[test]
    fn pop_oldest_returns_in_recency_order() {
        let mut index =
            LruIndex::from_entries(vec![entry("a", 10, 30), entry("b", 20, 20), entry("c", 30, 10)]);

        assert_eq!(index.pop_oldest().unwrap().name, "a");
        assert_eq!(index.aggregate_size(), 50);
        assert_eq!(index.pop_oldest().unwrap().name, "b");
        assert_eq!(index.pop_oldest().unwrap().name, "c");
        assert!(index.pop_oldest().is_none());
        assert_eq!(index.aggregate_size(), 0);
    }

    #[test]
    fn get_does_not_reorder() {
        let mut index = LruIndex::from_entries(vec![entry("a", 1, 30), entry("b", 1, 20)]);
        assert!(index.get("a").is_some());
        assert!(index.contains("a"));
        assert_eq!(index.pop_oldest().unwrap().name, "a");
    }
}
