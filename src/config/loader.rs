// src/config/loader.rs

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{Config, RawConfig};
use crate::errors::{HomekitError, Result};

/// Prefix for environment variables overriding config keys.
pub const ENV_PREFIX: &str = "HOMEKIT_";

/// Load a configuration file from a given path and return the raw `RawConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load configuration for the process.
///
/// - Reads TOML from `path` (a missing file means all defaults).
/// - Applies `HOMEKIT_*` environment overrides.
/// - Validates the result.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let raw = if path.exists() {
        load_from_path(path)?
    } else {
        debug!(path = ?path, "config file not found; using defaults");
        RawConfig::default()
    };

    let raw = apply_env_overrides(raw, |key| env::var(key).ok());
    Config::try_from(raw)
}

/// Overlay `HOMEKIT_<KEY>` variables onto `raw`. `lookup` reads a variable.
///
/// `HOMEKIT_PLUGIN_PATHS` is split with the platform path separator.
pub fn apply_env_overrides<F>(mut raw: RawConfig, lookup: F) -> RawConfig
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(&format!("{ENV_PREFIX}{key}"));

    if let Some(dir) = var("ASSET_OVERRIDES") {
        raw.asset_overrides = Some(PathBuf::from(dir));
    }
    if let Some(paths) = var("PLUGIN_PATHS") {
        raw.plugin_paths = env::split_paths(&paths)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
    }
    if let Some(dir) = var("TEMP_DIR") {
        raw.temp_dir = Some(PathBuf::from(dir));
    }
    if let Some(level) = var("LOG_LEVEL") {
        raw.log_level = Some(level);
    }
    raw
}

/// Default config location: `$XDG_CONFIG_HOME/homekit/config.toml`, falling
/// back to `~/.config/homekit/config.toml`, then `./homekit.toml`.
pub fn default_config_path() -> PathBuf {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));

    match base {
        Some(dir) => dir.join("homekit").join("config.toml"),
        None => PathBuf::from("homekit.toml"),
    }
}

/// Parse a TOML document without touching the filesystem.
pub fn parse_str(contents: &str) -> Result<RawConfig> {
    toml::from_str(contents).map_err(HomekitError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_replace_file_values() {
        let raw = parse_str(
            r#"
asset_overrides = "/from/file"
log_level = "info"
"#,
        )
        .unwrap();

        let vars: HashMap<&str, &str> = [
            ("HOMEKIT_ASSET_OVERRIDES", "/from/env"),
            ("HOMEKIT_PLUGIN_PATHS", "/a:/b"),
        ]
        .into_iter()
        .collect();
        let raw = apply_env_overrides(raw, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(raw.asset_overrides, Some(PathBuf::from("/from/env")));
        assert_eq!(raw.log_level.as_deref(), Some("info"));
        #[cfg(unix)]
        assert_eq!(raw.plugin_paths, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            parse_str("asset_override = \"/typo\""),
            Err(HomekitError::TomlError(_))
        ));
    }
}
