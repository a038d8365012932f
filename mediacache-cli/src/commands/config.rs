//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use std::path::Path;

use clap::Subcommand;
use mediacache::config::{format_size, ConfigFile};

use super::common::{load_config, resolve_config_path};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", resolve_config_path(config_path).display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            print!("{}", describe(&config));
            Ok(())
        }
        ConfigCommands::Init { force } => run_init(config_path, force),
    }
}

fn run_init(config_path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);
    if path.exists() && !force {
        println!("Config file already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    let result = if force {
        ConfigFile::default().save_to(&path)
    } else {
        ConfigFile::ensure_exists(&path)
    };
    result.map_err(|error| CliError::Config {
        path: path.clone(),
        error,
    })?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

/// Effective settings as `section.key = value` lines.
fn describe(config: &ConfigFile) -> String {
    let mut lines = vec![
        format!("cache.directory = {}", config.cache.directory.display()),
        format!("cache.size = {}", format_size(config.cache.size)),
        format!("cache.thumbnail_weight = {}", config.cache.thumbnail_weight),
        format!("cache.media_weight = {}", config.cache.media_weight),
        format!("cache.trim_factor = {}", config.cache.trim_factor),
        format!("cache.memory_thumbnails = {}", config.cache.memory_thumbnails),
        format!("cache.low_memory = {}", config.cache.low_memory),
        format!("keys.virtual_schemes = {}", config.keys.virtual_schemes.join(", ")),
        format!("keys.memo_capacity = {}", config.keys.memo_capacity),
    ];
    lines.extend(
        config
            .namespaces
            .iter()
            .map(|(host, namespace)| format!("namespaces.{} = {}", host, namespace)),
    );
    lines.iter().map(|line| format!("{}\n", line)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_describe_lists_all_keys() {
        let mut config = ConfigFile::default();
        config.namespaces.insert("a.example".into(), "a".into());

        let text = describe(&config);
        assert!(text.contains("cache.size = 256MB\n"));
        assert!(text.contains("cache.media_weight = 2\n"));
        assert!(text.contains("keys.virtual_schemes = resource\n"));
        assert!(text.contains("namespaces.a.example = a\n"));
    }

    #[test]
    fn test_init_respects_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[cache]\nsize = 1MB\n").unwrap();

        run_init(Some(&path), false).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().cache.size, 1024 * 1024);

        run_init(Some(&path), true).unwrap();
        assert_eq!(
            load_config(Some(&path)).unwrap(),
            ConfigFile::default()
        );
    }
}
