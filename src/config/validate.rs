// src/config/validate.rs

use crate::config::model::{Config, RawConfig};
use crate::errors::{HomekitError, Result};
use crate::logging::parse_level_str;

impl TryFrom<RawConfig> for Config {
    type Error = HomekitError;

    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let asset_overrides = raw
            .asset_overrides
            .filter(|p| !p.as_os_str().is_empty());
        let temp_dir = raw.temp_dir.filter(|p| !p.as_os_str().is_empty());
        let log_level = raw.log_level.as_deref().and_then(parse_level_str);

        Ok(Config::new_unchecked(
            asset_overrides,
            raw.plugin_paths,
            temp_dir,
            log_level,
        ))
    }
}

pub fn validate_config(raw: &RawConfig) -> Result<()> {
    validate_raw_config(raw)
}

fn validate_raw_config(cfg: &RawConfig) -> Result<()> {
    validate_asset_overrides(cfg)?;
    validate_plugin_paths(cfg)?;
    validate_log_level(cfg)?;
    Ok(())
}

fn validate_asset_overrides(cfg: &RawConfig) -> Result<()> {
    // A missing override directory is fine (nothing overridden yet); a file in
    // its place is not.
    if let Some(ref dir) = cfg.asset_overrides {
        if dir.exists() && !dir.is_dir() {
            return Err(HomekitError::ConfigError(format!(
                "asset_overrides {:?} exists but is not a directory",
                dir
            )));
        }
    }
    Ok(())
}

fn validate_plugin_paths(cfg: &RawConfig) -> Result<()> {
    for (idx, path) in cfg.plugin_paths.iter().enumerate() {
        if path.as_os_str().is_empty() {
            return Err(HomekitError::ConfigError(format!(
                "plugin_paths[{}] must not be empty",
                idx
            )));
        }
    }
    Ok(())
}

fn validate_log_level(cfg: &RawConfig) -> Result<()> {
    if let Some(ref level) = cfg.log_level {
        if parse_level_str(level).is_none() {
            return Err(HomekitError::ConfigError(format!(
                "invalid log_level: {} (expected error, warn, info, debug or trace)",
                level
            )));
        }
    }
    Ok(())
}
