//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written to `config.ini`. The
//! output parses back to an equal `ConfigFile`.

use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let namespaces: String = config
        .namespaces
        .iter()
        .map(|(host, namespace)| format!("{} = {}\n", host, namespace))
        .collect();

    format!(
        r#"[cache]
; Root directory of the cache. Thumbnails and media live in subdirectories.
; Default: platform cache directory + /mediacache
directory = {}
; Total disk budget shared by both partitions (default: 256MB)
; Supports: KB, MB, GB suffixes (e.g., 500MB, 2GB)
size = {}
; Relative budget weights. With 1 and 2, thumbnails get a third of the budget.
thumbnail_weight = {}
media_weight = {}
; Extra fraction of a partition's ceiling freed by each eviction pass (0.0 - 1.0)
trim_factor = {}
; Thumbnails kept in memory (default: 200)
memory_thumbnails = {}
; Shrink the memory tier to 50 thumbnails on constrained devices
low_memory = {}

[keys]
; Schemes whose identities are hashed as-is, comma separated
virtual_schemes = {}
; Number of derived keys remembered (default: 1000)
memo_capacity = {}

[namespaces]
; host = namespace
; Hosts sharing a namespace map the same path to the same cache key.
{}"#,
        path_to_string(&config.cache.directory),
        format_size(config.cache.size),
        config.cache.thumbnail_weight,
        config.cache.media_weight,
        config.cache.trim_factor,
        config.cache.memory_thumbnails,
        config.cache.low_memory,
        config.keys.virtual_schemes.join(", "),
        config.keys.memo_capacity,
        namespaces,
    )
}

/// Convert path to string, collapsing the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::ConfigFile;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_written_config_loads_back() {
        let mut config = ConfigFile::default();
        config.cache.directory = PathBuf::from("/srv/cache");
        config.cache.size = 3 * 1024 * 1024 * 1024;
        config.cache.media_weight = 5;
        config.cache.trim_factor = 0.1;
        config.cache.low_memory = true;
        config.keys.virtual_schemes = vec!["resource".into(), "local".into()];
        config
            .namespaces
            .insert("images.example.org".into(), "example".into());

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, to_config_string(&config)).unwrap();

        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_contains_all_sections() {
        let content = to_config_string(&ConfigFile::default());
        assert!(content.contains("[cache]"));
        assert!(content.contains("[keys]"));
        assert!(content.contains("[namespaces]"));
        assert!(content.contains("size = 256MB"));
        assert!(content.contains("virtual_schemes = resource"));
    }

    #[test]
    fn test_path_to_string_collapses_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path_to_string(&home.join("cache")), "~/cache");
        }
        assert_eq!(path_to_string(Path::new("/tmp/x")), "/tmp/x");
    }
}
