// src/logging.rs

//! Logging setup for `homekit` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `HOMEKIT_LOG` environment variable (e.g. "info", "debug")
//! 3. `log_level` from the config file
//! 4. default to `info`
//!
//! Logs are sent to STDERR so that command stdout can be used purely for
//! child output.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;
use crate::types::LogFormat;

pub const LOG_ENV_VAR: &str = "HOMEKIT_LOG";

/// How the subscriber should be configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    pub cli_level: Option<LogLevel>,
    pub config_level: Option<tracing::Level>,
    pub format: LogFormat,
    pub no_color: bool,
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(options: LogOptions) -> Result<()> {
    let env_level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|s| parse_level_str(&s));
    let level = resolve_level(options.cli_level, env_level, options.config_level);

    // Send logs to stderr; keep stdout free for command output.
    let builder = fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(!options.no_color)
        .with_writer(std::io::stderr);

    let installed = match options.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

/// Pick the effective level from its three possible sources.
pub fn resolve_level(
    cli_level: Option<LogLevel>,
    env_level: Option<tracing::Level>,
    config_level: Option<tracing::Level>,
) -> tracing::Level {
    cli_level
        .map(level_from_log_level)
        .or(env_level)
        .or(config_level)
        .unwrap_or(tracing::Level::INFO)
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

pub(crate) fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn cli_beats_env_beats_config() {
        assert_eq!(
            resolve_level(Some(LogLevel::Trace), Some(Level::WARN), Some(Level::ERROR)),
            Level::TRACE
        );
        assert_eq!(
            resolve_level(None, Some(Level::WARN), Some(Level::ERROR)),
            Level::WARN
        );
        assert_eq!(resolve_level(None, None, Some(Level::ERROR)), Level::ERROR);
        assert_eq!(resolve_level(None, None, None), Level::INFO);
    }

    #[test]
    fn level_strings_are_case_insensitive() {
        assert_eq!(parse_level_str(" DEBUG "), Some(Level::DEBUG));
        assert_eq!(parse_level_str("warning"), Some(Level::WARN));
        assert_eq!(parse_level_str("verbose"), None);
    }
}
