#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use homekit::assets::{AssetStore, Bundle};
use homekit::config::{Config, RawConfig};
use homekit::exec::{ExecutionSpec, ScriptOptions};
use homekit::fs::mock::MockFileSystem;
use tempfile::TempDir;

/// Builder for `Config` to simplify test setup. Goes through the same
/// validation as a config file.
pub struct ConfigBuilder {
    config: RawConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfig::default(),
        }
    }

    pub fn asset_overrides(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.asset_overrides = Some(dir.into());
        self
    }

    pub fn plugin_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.plugin_paths.push(dir.into());
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.log_level = Some(level.to_string());
        self
    }

    pub fn build(self) -> Config {
        Config::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A `sh -c` spec with output captured, the shape most executor tests need.
pub fn sh(script: &str) -> ExecutionSpec {
    ExecutionSpec::new("/bin/sh")
        .arg("-c")
        .arg(script)
        .capture_output(true)
}

/// Script options with capture on and a generous safety timeout.
pub fn captured_script() -> ScriptOptions {
    ScriptOptions {
        capture_output: true,
        timeout: Some(Duration::from_secs(10)),
        ..ScriptOptions::default()
    }
}

/// Builder for a bundle with hand-picked entries.
pub struct BundleBuilder {
    bundle: Bundle,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self {
            bundle: Bundle::new(),
        }
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.bundle.insert(path, content.as_bytes().to_vec());
        self
    }

    pub fn build(self) -> Bundle {
        self.bundle
    }
}

impl Default for BundleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An override directory on disk, removed when dropped.
pub struct OverrideTree {
    dir: TempDir,
}

impl OverrideTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create override tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<root>/<namespace>/<name>`, creating parents.
    pub fn file(&self, namespace: &str, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(namespace).join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create override parent");
        }
        fs::write(&path, content).expect("write override file");
        path
    }

    /// Asset store over `bundle` with this directory as override root.
    pub fn store(&self, bundle: Bundle) -> AssetStore {
        AssetStore::new(bundle, Some(self.root().to_path_buf()))
    }
}

impl Default for OverrideTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Asset store over an in-memory filesystem rooted at `/ovr`.
pub fn mock_store(bundle: Bundle, fs: Arc<MockFileSystem>) -> AssetStore {
    AssetStore::with_filesystem(bundle, Some(PathBuf::from("/ovr")), fs)
}
