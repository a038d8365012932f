//! Storage availability and partition directory resolution.
//!
//! Layout below the cache root:
//!
//! ```text
//! <root>/thumbnails/<key>
//! <root>/media/<key>
//! <root>/share/share-<millis>.<ext>
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use super::types::Partition;

/// Directory name for files staged for sharing.
pub const SHARE_DIRECTORY: &str = "share";

/// Reports whether the storage medium holding the cache is usable.
pub trait StorageProvider: Send + Sync {
    /// `true` while the medium is mounted and writable.
    fn is_mounted(&self) -> bool;

    /// Root directory of the cache, if the medium exposes one.
    fn cache_root(&self) -> Option<PathBuf>;
}

/// Storage on a local directory.
///
/// The mounted flag starts `true` and can be toggled to model removable
/// media being ejected and reinserted.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    mounted: Arc<AtomicBool>,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Change the reported mount state.
    pub fn set_mounted(&self, mounted: bool) {
        self.mounted.store(mounted, Ordering::Relaxed);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StorageProvider for LocalStorage {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Relaxed)
    }

    fn cache_root(&self) -> Option<PathBuf> {
        Some(self.root.clone())
    }
}

/// Lazily locates and creates the partition directories.
///
/// A directory is created on the first resolution that finds the medium
/// mounted, and its path is remembered afterwards. Resolution still returns
/// `None` whenever the medium is reported unmounted.
pub struct DirectoryResolver {
    storage: Arc<dyn StorageProvider>,
    partitions: [OnceLock<PathBuf>; 2],
    share: OnceLock<PathBuf>,
}

impl DirectoryResolver {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            storage,
            partitions: [OnceLock::new(), OnceLock::new()],
            share: OnceLock::new(),
        }
    }

    /// Whether the medium is currently mounted.
    pub fn is_available(&self) -> bool {
        self.storage.is_mounted()
    }

    /// Directory for a partition, or `None` if storage is unavailable.
    pub fn resolve(&self, partition: Partition) -> Option<PathBuf> {
        self.resolve_cell(&self.partitions[partition.slot()], partition.directory_name())
    }

    /// Directory for share staging, or `None` if storage is unavailable.
    pub fn share_directory(&self) -> Option<PathBuf> {
        self.resolve_cell(&self.share, SHARE_DIRECTORY)
    }

    /// Partition whose directory directly contains `path`.
    ///
    /// Returns `None` for files outside the managed directories.
    pub fn partition_of(&self, path: &Path) -> Option<Partition> {
        let parent = path.parent()?;
        Partition::ALL.into_iter().find(|partition| {
            self.resolve(*partition)
                .is_some_and(|dir| same_directory(&dir, parent))
        })
    }

    fn resolve_cell(&self, cell: &OnceLock<PathBuf>, name: &str) -> Option<PathBuf> {
        if !self.storage.is_mounted() {
            return None;
        }
        if let Some(dir) = cell.get() {
            return Some(dir.clone());
        }

        let dir = self.storage.cache_root()?.join(name);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(
                dir = %dir.display(),
                error = %e,
                "Failed to create cache directory"
            );
            return None;
        }
        debug!(dir = %dir.display(), "Cache directory resolved");
        Some(cell.get_or_init(|| dir).clone())
    }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
