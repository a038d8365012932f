//! Staging area for handing cached files to other applications.
//!
//! Cached files are named by key and carry no extension, so they are copied
//! into the share directory under a readable, timestamped name first. Staged
//! copies are short-lived and purged after [`SHARE_FILE_MAX_AGE`].

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

/// Age after which a staged share file is removed.
pub const SHARE_FILE_MAX_AGE: Duration = Duration::from_secs(60 * 60);

const SHARE_PREFIX: &str = "share-";
const DEFAULT_EXTENSION: &str = "jpg";
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Remove staged files older than `max_age`.
///
/// Returns the number of files removed.
pub fn purge_stale_share_files(dir: &Path, max_age: Duration) -> usize {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return 0;
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for dir_entry in read_dir.flatten() {
        let Ok(metadata) = dir_entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }
        let path = dir_entry.path();
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => debug!(
                path = %path.display(),
                error = %e,
                "Failed to remove stale share file"
            ),
        }
    }

    if removed > 0 {
        debug!(dir = %dir.display(), removed, "Purged stale share files");
    }
    removed
}

/// Copy `source` into `dir` as `share-<millis>.<ext>`.
///
/// The extension is taken from `source_name`, falling back to `jpg`. A
/// name already taken in the same millisecond gets a `-<n>` suffix.
pub fn stage_share_file(dir: &Path, source: &Path, source_name: &str) -> Option<PathBuf> {
    purge_stale_share_files(dir, SHARE_FILE_MAX_AGE);

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let extension = share_extension(source_name);

    let staged = File::open(source).and_then(|mut reader| {
        let (target, mut writer) = create_unique(dir, millis, extension)?;
        match io::copy(&mut reader, &mut writer) {
            Ok(_) => Ok(target),
            Err(e) => {
                let _ = std::fs::remove_file(&target);
                Err(e)
            }
        }
    });

    match staged {
        Ok(target) => Some(target),
        Err(e) => {
            warn!(
                source = %source.display(),
                dir = %dir.display(),
                error = %e,
                "Failed to stage file for sharing"
            );
            None
        }
    }
}

/// Create a share file that did not exist before.
fn create_unique(dir: &Path, millis: u128, extension: &str) -> io::Result<(PathBuf, File)> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = match attempt {
            0 => format!("{}{}.{}", SHARE_PREFIX, millis, extension),
            n => format!("{}{}-{}.{}", SHARE_PREFIX, millis, n, extension),
        };
        let target = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => return Ok((target, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(ErrorKind::AlreadyExists, "no free share file name"))
}

fn share_extension(source_name: &str) -> &str {
    Path::new(source_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(DEFAULT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_file(path: &Path, size: usize, age_secs: u64) {
        std::fs::write(path, vec![7u8; size]).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(mtime)).unwrap();
    }

    #[test]
    fn test_share_extension() {
        assert_eq!(share_extension("photo.PNG"), "PNG");
        assert_eq!(share_extension("clip.webm"), "webm");
        assert_eq!(share_extension("noextension"), "jpg");
        assert_eq!(share_extension("trailing."), "jpg");
    }

    #[test]
    fn test_purge_removes_only_stale_files() {
        let temp = TempDir::new().unwrap();
        create_test_file(&temp.path().join("share-1.jpg"), 10, 2 * 60 * 60);
        create_test_file(&temp.path().join("share-2.jpg"), 10, 60);

        let removed = purge_stale_share_files(temp.path(), SHARE_FILE_MAX_AGE);

        assert_eq!(removed, 1);
        assert!(!temp.path().join("share-1.jpg").exists());
        assert!(temp.path().join("share-2.jpg").exists());
    }

    #[test]
    fn test_purge_missing_directory() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            purge_stale_share_files(&temp.path().join("missing"), SHARE_FILE_MAX_AGE),
            0
        );
    }

    #[test]
    fn test_stage_copies_with_extension() {
        let temp = TempDir::new().unwrap();
        let share_dir = temp.path().join("share");
        std::fs::create_dir(&share_dir).unwrap();
        let source = temp.path().join("abcdef");
        std::fs::write(&source, b"payload").unwrap();

        let staged = stage_share_file(&share_dir, &source, "original.gif").unwrap();

        assert_eq!(staged.parent().unwrap(), share_dir);
        let name = staged.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("share-"));
        assert!(name.ends_with(".gif"));
        assert_eq!(std::fs::read(&staged).unwrap(), b"payload");
        assert!(source.exists());
    }

    #[test]
    fn test_stage_same_millisecond_keeps_both_copies() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        std::fs::write(&source, b"first").unwrap();

        let (taken, _) = create_unique(temp.path(), 42, "png").unwrap();
        let (next, _) = create_unique(temp.path(), 42, "png").unwrap();
        assert_eq!(taken, temp.path().join("share-42.png"));
        assert_eq!(next, temp.path().join("share-42-1.png"));

        let a = stage_share_file(temp.path(), &source, "a.png").unwrap();
        std::fs::write(&source, b"second").unwrap();
        let b = stage_share_file(temp.path(), &source, "b.png").unwrap();
        assert_ne!(a, b);
        assert_eq!(std::fs::read(&a).unwrap(), b"first");
        assert_eq!(std::fs::read(&b).unwrap(), b"second");
    }

    #[test]
    fn test_stage_missing_source() {
        let temp = TempDir::new().unwrap();
        let staged = stage_share_file(temp.path(), &temp.path().join("missing"), "a.jpg");
        assert!(staged.is_none());
    }

    #[test]
    fn test_stage_purges_stale_files_first() {
        let temp = TempDir::new().unwrap();
        create_test_file(&temp.path().join("share-old.jpg"), 10, 3 * 60 * 60);
        let source = temp.path().join("src");
        std::fs::write(&source, b"x").unwrap();
        // Source lives in the same directory but is fresh.
        stage_share_file(temp.path(), &source, "a.png").unwrap();

        assert!(!temp.path().join("share-old.jpg").exists());
        assert!(source.exists());
    }
}
