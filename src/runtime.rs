// src/runtime.rs

//! Process-wide context built once at start-up and passed by reference to
//! every command.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assets::{AssetStore, Bundle};
use crate::bufpool::BufferPool;
use crate::config::Config;
use crate::exec::RealExecutorBackend;

/// Initial capacity of buffers lent for captured output.
pub const CAPTURE_BUFFER_INITIAL: usize = 1024;
/// Buffers that grew past this are dropped instead of returned to the pool.
pub const CAPTURE_BUFFER_MAX_RETAINED: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub build_source: &'static str,
}

impl VersionInfo {
    /// Values baked in at compile time. `HOMEKIT_GIT_COMMIT` and
    /// `HOMEKIT_BUILD_SOURCE` are read from the build environment.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("HOMEKIT_GIT_COMMIT").unwrap_or("unknown"),
            build_source: option_env!("HOMEKIT_BUILD_SOURCE").unwrap_or("local"),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "homekit {} (commit {}, source {})",
            self.version, self.commit, self.build_source
        )
    }
}

#[derive(Debug)]
pub struct Runtime {
    config: Config,
    assets: AssetStore,
    buffers: BufferPool,
    dry_run: bool,
    version: VersionInfo,
    cancel: CancellationToken,
}

impl Runtime {
    /// Build the runtime over the embedded bundle and the configured override
    /// directory.
    pub fn bootstrap(config: Config, options: RuntimeOptions) -> Self {
        let assets = AssetStore::new(Bundle::embedded(), config.asset_overrides.clone());
        Self::with_assets(config, assets, options)
    }

    /// Same as [`Runtime::bootstrap`] with a caller-supplied asset store.
    pub fn with_assets(config: Config, assets: AssetStore, options: RuntimeOptions) -> Self {
        let runtime = Self {
            config,
            assets,
            buffers: BufferPool::new(CAPTURE_BUFFER_INITIAL, CAPTURE_BUFFER_MAX_RETAINED),
            dry_run: options.dry_run,
            version: VersionInfo::current(),
            cancel: CancellationToken::new(),
        };

        debug!(
            overrides = ?runtime.assets.override_root(),
            dry_run = runtime.dry_run,
            version = runtime.version.version,
            "runtime bootstrapped"
        );
        runtime
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn buffers(&self) -> &BufferPool {
        &self.buffers
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    /// Root token; cancelling it aborts every run started from this runtime.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Token for a single run, cancelled along with the root.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Production backend sharing this runtime's buffer pool.
    pub fn backend(&self) -> RealExecutorBackend {
        RealExecutorBackend::with_buffer_pool(self.buffers.clone())
    }

    /// Cancel the root token on Ctrl-C. Must be called inside a tokio runtime.
    pub fn cancel_on_ctrl_c(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => match res {
                    Ok(()) => {
                        cancel.cancel();
                        info!("Ctrl-C received; cancelled running work");
                    }
                    Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
                },
                _ = cancel.cancelled() => {}
            }
        });
    }
}
