//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.
//! Missing sections and keys keep their defaults.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("size") {
            config.cache.size = parse_size(v).map_err(|_| {
                invalid("cache", "size", v, "expected format like '256MB', '2GB', or '1024KB'")
            })?;
        }
        if let Some(v) = section.get("thumbnail_weight") {
            config.cache.thumbnail_weight =
                parse_number(v, "cache", "thumbnail_weight", "must be a non-negative integer")?;
        }
        if let Some(v) = section.get("media_weight") {
            config.cache.media_weight =
                parse_number(v, "cache", "media_weight", "must be a non-negative integer")?;
        }
        if config.cache.thumbnail_weight == 0 && config.cache.media_weight == 0 {
            return Err(invalid(
                "cache",
                "media_weight",
                "0",
                "at least one partition weight must be non-zero",
            ));
        }
        if let Some(v) = section.get("trim_factor") {
            let trim: f64 = parse_number(v, "cache", "trim_factor", "must be a number")?;
            if !(0.0..=1.0).contains(&trim) {
                return Err(invalid(
                    "cache",
                    "trim_factor",
                    v,
                    "must be between 0.0 and 1.0",
                ));
            }
            config.cache.trim_factor = trim;
        }
        if let Some(v) = section.get("memory_thumbnails") {
            config.cache.memory_thumbnails =
                parse_number(v, "cache", "memory_thumbnails", "must be a positive integer")?;
        }
        if let Some(v) = section.get("low_memory") {
            config.cache.low_memory = parse_bool(v)
                .ok_or_else(|| invalid("cache", "low_memory", v, "must be 'true' or 'false'"))?;
        }
    }

    // [keys] section
    if let Some(section) = ini.section(Some("keys")) {
        if let Some(v) = section.get("virtual_schemes") {
            config.keys.virtual_schemes = v
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = section.get("memo_capacity") {
            config.keys.memo_capacity =
                parse_number(v, "keys", "memo_capacity", "must be a positive integer")?;
        }
    }

    // [namespaces] section: every key is a host
    if let Some(section) = ini.section(Some("namespaces")) {
        for (host, namespace) in section.iter() {
            let host = host.trim().to_ascii_lowercase();
            let namespace = namespace.trim();
            if host.is_empty() || namespace.is_empty() {
                return Err(invalid(
                    "namespaces",
                    &host,
                    namespace,
                    "host and namespace must both be non-empty",
                ));
            }
            config.namespaces.insert(host, namespace.to_string());
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    v: &str,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    v.trim().parse().map_err(|_| invalid(section, key, v, reason))
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~/` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
