//! Logging setup for the mediacache tools.
//!
//! The library only emits `tracing` events; binaries call [`init_logging`]
//! once to install a subscriber:
//! - Compact output on stderr, leaving stdout for command output
//! - Optional plain-text log file, truncated at startup
//! - Filter from `RUST_LOG`, otherwise `info` (or `debug` when verbose)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log file name used when logging to a directory.
pub const DEFAULT_LOG_FILE: &str = "mediacache.log";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// With `log_file`, events are also written to that file, which is created
/// (with its parent directory) and cleared first.
///
/// # Errors
///
/// Fails if the log file cannot be prepared or a subscriber is already set.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<LoggingGuard, io::Error> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let (file_layer, file_guard) = match log_file {
        Some(path) => {
            let (dir, name) = prepare_log_file(path)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Filter from `RUST_LOG`, falling back to the verbosity flag.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(verbose)))
}

fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Create the parent directory and truncate the file.
///
/// Returns the directory and file name for the appender.
fn prepare_log_file(path: &Path) -> Result<(PathBuf, String), io::Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();

    fs::create_dir_all(&dir)?;
    fs::write(dir.join(&name), "")?;
    Ok((dir, name))
}

/// Default log file location (`~/.mediacache/mediacache.log`).
pub fn default_log_path() -> PathBuf {
    crate::config::config_directory().join(DEFAULT_LOG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(false), "info");
        assert_eq!(default_level(true), "debug");
    }

    #[test]
    fn test_default_log_path() {
        let path = default_log_path();
        assert!(path.ends_with(".mediacache/mediacache.log"));
    }

    #[test]
    fn test_prepare_creates_directory_and_clears_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/deep/cache.log");

        let (dir, name) = prepare_log_file(&path).unwrap();
        assert_eq!(dir, temp.path().join("nested/deep"));
        assert_eq!(name, "cache.log");
        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        fs::write(&path, "old log data").unwrap();
        prepare_log_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_prepare_uses_parent_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x.log");
        let (dir, _) = prepare_log_file(&path).unwrap();
        assert_eq!(dir, temp.path());
    }

    #[test]
    fn test_guard_structure() {
        use tracing_appender::non_blocking::NonBlocking;

        let (non_blocking, guard) = NonBlocking::new(std::io::sink());
        drop(non_blocking);

        let _logging_guard = LoggingGuard {
            _file_guard: Some(guard),
        };
    }
}
