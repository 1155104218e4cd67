// src/lib.rs

pub mod assets;
pub mod bufpool;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod runtime;
pub mod types;

use std::io;

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::Config;
use crate::errors::Result;
use crate::runtime::{Runtime, RuntimeOptions};

/// Load the config named by `--config`, or the default location.
pub fn load_config(args: &CliArgs) -> Result<Config> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    debug!(path = ?path, "loading config");
    config::load_and_validate(&path)
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the runtime context (assets, buffer pool, cancellation)
/// - Ctrl-C handling
/// - the selected subcommand
///
/// Returns the exit code the process should terminate with.
pub async fn run(args: CliArgs, config: Config) -> Result<i32> {
    let runtime = Runtime::bootstrap(
        config,
        RuntimeOptions {
            dry_run: args.dry_run,
        },
    );
    runtime.cancel_on_ctrl_c();

    // Unlocked handles: the Ctrl-C task and tracing also write to these
    // streams while the command is awaiting.
    let mut out = io::stdout();
    let mut err = io::stderr();

    let code = commands::execute(&runtime, args.command, &mut out, &mut err).await;
    runtime.cancel_token().cancel();
    code
}
