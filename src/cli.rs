// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{parse_duration, AssetNamespace, LogFormat};

/// Command-line arguments for `homekit`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "homekit",
    version,
    about = "Run embedded helper scripts and external commands, and manage bundled assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$XDG_CONFIG_HOME/homekit/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HOMEKIT_LOG`, the config file or a default level will be
    /// used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Log output format.
    #[arg(long, global = true, value_enum, value_name = "FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Disable ANSI colours in log output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Resolve and validate everything, but don't start any process.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run or list scripts.
    #[command(subcommand)]
    Script(ScriptCommand),

    /// Inspect, extract and checksum bundled assets.
    #[command(subcommand)]
    Assets(AssetsCommand),

    /// Print version, commit and build source.
    Version,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ScriptCommand {
    /// Run an executable, or an embedded script with `--embedded`.
    Run(RunArgs),

    /// List the scripts available in the asset store.
    List,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Executable path, or script name when `--embedded` is given.
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Arguments passed through to the target.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Treat TARGET as the name of a script in the asset store.
    #[arg(long)]
    pub embedded: bool,

    /// Kill the run after this long (e.g. `30s`, `5m`). `0` disables.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, default_value = "5m")]
    pub timeout: Duration,

    /// Extra environment variable, `KEY=VALUE`. May be repeated.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Working directory for the run.
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum AssetsCommand {
    /// List asset names in a namespace.
    List {
        #[arg(value_name = "NAMESPACE")]
        namespace: AssetNamespace,
    },

    /// Write an asset to a directory with mode 0755.
    Extract {
        #[arg(value_name = "NAMESPACE")]
        namespace: AssetNamespace,
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "DEST")]
        dest: PathBuf,
    },

    /// Print the SHA-256 of an asset's resolved content.
    Verify {
        #[arg(value_name = "NAMESPACE")]
        namespace: AssetNamespace,
        #[arg(value_name = "NAME")]
        name: String,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
