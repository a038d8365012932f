//! mediacache CLI - administration for the partitioned media cache
//!
//! Inspects and erases the on-disk cache described by the config file and
//! derives cache keys for resource identities.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mediacache::logging::{default_log_path, init_logging};

use commands::cache::EraseTarget;
use commands::common::load_config;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "mediacache")]
#[command(version)]
#[command(about = "Inspect and manage the mediacache thumbnail and media cache", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.mediacache/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log file (default: ~/.mediacache/mediacache.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show partition sizes, ceilings and counters
    Stats,

    /// Remove every entry from one or both partitions
    Erase {
        /// Partition to erase
        #[arg(value_enum)]
        target: EraseTarget,
    },

    /// Print the cache key for a resource identity
    Key {
        /// URL, data: identity or virtual-scheme identity
        identity: String,

        /// Also print the string that is hashed
        #[arg(long)]
        canonical: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let _logging = match init_logging(cli.verbose, Some(log_file_path(&cli).as_path())) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn log_file_path(cli: &Cli) -> PathBuf {
    cli.log_file.clone().unwrap_or_else(default_log_path)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Stats => commands::cache::run_stats(&load_config(config_path)?),
        Commands::Erase { target } => {
            commands::cache::run_erase(&load_config(config_path)?, target)
        }
        Commands::Key {
            identity,
            canonical,
        } => {
            commands::key::run(&load_config(config_path)?, &identity, canonical);
            Ok(())
        }
        Commands::Config { command } => commands::config::run(command, config_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_stats_with_globals() {
        let cli = parse(&["mediacache", "stats", "--config", "/tmp/c.ini", "-v"]);
        assert!(matches!(cli.command, Commands::Stats));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.ini")));
        assert!(cli.verbose);
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn test_parse_erase_targets() {
        for (arg, expected) in [
            ("thumbnails", EraseTarget::Thumbnails),
            ("media", EraseTarget::Media),
            ("all", EraseTarget::All),
        ] {
            match parse(&["mediacache", "erase", arg]).command {
                Commands::Erase { target } => assert_eq!(target, expected),
                other => panic!("unexpected command {:?}", other),
            }
        }
        assert!(Cli::try_parse_from(["mediacache", "erase", "everything"]).is_err());
        assert!(Cli::try_parse_from(["mediacache", "erase"]).is_err());
    }

    #[test]
    fn test_parse_key() {
        let cli = parse(&["mediacache", "key", "https://a.example/1.png", "--canonical"]);
        match cli.command {
            Commands::Key {
                identity,
                canonical,
            } => {
                assert_eq!(identity, "https://a.example/1.png");
                assert!(canonical);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_subcommands() {
        assert!(matches!(
            parse(&["mediacache", "config", "path"]).command,
            Commands::Config {
                command: ConfigCommands::Path
            }
        ));
        assert!(matches!(
            parse(&["mediacache", "--log-file", "/tmp/m.log", "config", "init", "--force"]).command,
            Commands::Config {
                command: ConfigCommands::Init { force: true }
            }
        ));
    }

    #[test]
    fn test_log_file_defaults_to_config_directory() {
        let cli = parse(&["mediacache", "stats"]);
        assert_eq!(log_file_path(&cli), default_log_path());

        let cli = parse(&["mediacache", "stats", "--log-file", "/tmp/m.log"]);
        assert_eq!(log_file_path(&cli), PathBuf::from("/tmp/m.log"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["mediacache"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
