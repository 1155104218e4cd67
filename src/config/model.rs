// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// asset_overrides = "~/.local/share/homekit/overrides"
/// plugin_paths = ["/usr/local/lib/homekit/plugins"]
/// temp_dir = "/tmp/homekit"
/// log_level = "debug"
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Root of the asset override tree (`<root>/<namespace>/<name>`).
    #[serde(default)]
    pub asset_overrides: Option<PathBuf>,

    /// Directories searched for plugin executables.
    #[serde(default)]
    pub plugin_paths: Vec<PathBuf>,

    /// Scratch directory for exported assets and similar.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Log level used when neither the CLI flag nor `HOMEKIT_LOG` is set.
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Validated configuration, read-only after start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub asset_overrides: Option<PathBuf>,
    pub plugin_paths: Vec<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub log_level: Option<tracing::Level>,
}

impl Config {
    pub(crate) fn new_unchecked(
        asset_overrides: Option<PathBuf>,
        plugin_paths: Vec<PathBuf>,
        temp_dir: Option<PathBuf>,
        log_level: Option<tracing::Level>,
    ) -> Self {
        Self {
            asset_overrides,
            plugin_paths,
            temp_dir,
            log_level,
        }
    }

    /// Temp directory to use, defaulting to the platform one.
    pub fn effective_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
