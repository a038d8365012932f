//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use mediacache::cache::CacheError;
use mediacache::config::ConfigFileError;

/// Exit code for a run stopped by Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to load or write the config file
    Config {
        path: PathBuf,
        error: ConfigFileError,
    },
    /// Failed to start or operate the cache
    Cache(CacheError),
    /// Failed to install the Ctrl-C handler
    SignalHandler(String),
}

impl CliError {
    /// Exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Cache(CacheError::Interrupted { .. }) => EXIT_INTERRUPTED,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config { path, .. } => {
                eprintln!();
                eprintln!("Check the file at {}", path.display());
                eprintln!("or recreate it with: mediacache config init --force");
            }
            CliError::Cache(CacheError::Interrupted { .. }) => {
                eprintln!("Erased files are gone; the remaining entries are still cached.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config { error, .. } => write!(f, "Configuration error: {}", error),
            CliError::Cache(e) => write!(f, "{}", e),
            CliError::SignalHandler(msg) => write!(f, "Failed to set signal handler: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config { error, .. } => Some(error),
            CliError::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_exit_code() {
        let err = CliError::from(CacheError::Interrupted {
            removed: 3,
            remaining: 7,
        });
        assert_eq!(err.exit_code(), 130);
        assert!(err.to_string().contains("removed 3 entries, 7 remain"));
    }

    #[test]
    fn test_other_errors_exit_with_one() {
        let err = CliError::Cache(CacheError::InvalidConfig("bad".to_string()));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(CliError::LoggingInit("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_config_error_has_source() {
        use std::error::Error;

        let err = CliError::Config {
            path: PathBuf::from("/tmp/config.ini"),
            error: ConfigFileError::WriteError("disk full".into()),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("disk full"));
    }
}
