// src/assets/store.rs

use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{AssetError, Bundle};
use crate::fs::{FileSystem, RealFileSystem};

/// Mode applied to exported assets.
pub const EXPORT_MODE: u32 = 0o755;

/// Where a resolved asset came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Override(PathBuf),
    Embedded,
}

/// Resolves `(namespace, name)` pairs against the override directory first and
/// the embedded bundle second.
///
/// The store only ever reads from the override directory. Reads are safe to
/// share between threads; [`AssetStore::export`] is the only write and is not
/// atomic.
#[derive(Debug, Clone)]
pub struct AssetStore {
    bundle: Arc<Bundle>,
    override_root: Option<PathBuf>,
    fs: Arc<dyn FileSystem>,
}

impl AssetStore {
    /// Store over the real filesystem. An empty `override_root` disables
    /// overrides.
    pub fn new(bundle: Bundle, override_root: Option<PathBuf>) -> Self {
        Self::with_filesystem(bundle, override_root, Arc::new(RealFileSystem))
    }

    pub fn with_filesystem(
        bundle: Bundle,
        override_root: Option<PathBuf>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let override_root = override_root.filter(|p| !p.as_os_str().is_empty());
        Self {
            bundle: Arc::new(bundle),
            override_root,
            fs,
        }
    }

    pub fn override_root(&self) -> Option<&Path> {
        self.override_root.as_deref()
    }

    /// Sorted, de-duplicated names available under `namespace`, drawn from the
    /// bundle and the override directory.
    pub fn list(&self, namespace: impl AsRef<str>) -> Vec<String> {
        let namespace = namespace.as_ref().trim_matches('/');
        let mut names: BTreeSet<String> = BTreeSet::new();

        if is_clean_relative(namespace) {
            names.extend(self.bundle.names_under(namespace).map(str::to_string));

            if let Some(root) = self.override_namespace_dir(namespace) {
                self.walk_override(&root, &root, &mut names);
            }
        }

        debug!(namespace, count = names.len(), "listed assets");
        names.into_iter().collect()
    }

    /// Where `(namespace, name)` would be read from, without reading it.
    pub fn source_of(
        &self,
        namespace: impl AsRef<str>,
        name: &str,
    ) -> Result<AssetSource, AssetError> {
        let namespace = namespace.as_ref().trim_matches('/');
        if !is_clean_relative(namespace) || !is_clean_relative(name) {
            return Err(not_found(namespace, name));
        }

        if let Some(path) = self.override_path(namespace, name) {
            if self.fs.is_file(&path) {
                return Ok(AssetSource::Override(path));
            }
        }

        if self.bundle.get(&bundle_key(namespace, name)).is_some() {
            return Ok(AssetSource::Embedded);
        }

        Err(not_found(namespace, name))
    }

    /// Open a read handle, preferring the override directory.
    ///
    /// An override file that exists but cannot be opened falls back to the
    /// bundle, matching "present and readable".
    pub fn open(
        &self,
        namespace: impl AsRef<str>,
        name: &str,
    ) -> Result<Box<dyn Read + Send>, AssetError> {
        let namespace = namespace.as_ref().trim_matches('/');
        if !is_clean_relative(namespace) || !is_clean_relative(name) {
            return Err(not_found(namespace, name));
        }

        if let Some(path) = self.override_path(namespace, name) {
            if self.fs.is_file(&path) {
                match self.fs.open_read(&path) {
                    Ok(reader) => {
                        debug!(namespace, name, path = ?path, "resolved asset from override");
                        return Ok(reader);
                    }
                    Err(err) => {
                        debug!(
                            namespace,
                            name,
                            path = ?path,
                            error = %err,
                            "override unreadable; falling back to embedded bundle"
                        );
                    }
                }
            }
        }

        match self.bundle.get(&bundle_key(namespace, name)) {
            Some(bytes) => {
                debug!(namespace, name, "resolved asset from embedded bundle");
                Ok(Box::new(Cursor::new(bytes.clone())))
            }
            None => Err(not_found(namespace, name)),
        }
    }

    /// Read an asset to completion.
    pub fn open_bytes(
        &self,
        namespace: impl AsRef<str>,
        name: &str,
    ) -> Result<Vec<u8>, AssetError> {
        let namespace = namespace.as_ref();
        let mut reader = self.open(namespace, name)?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| io_error(namespace, name, e.into()))?;
        Ok(bytes)
    }

    /// Write the resolved asset to `dest_dir/name` with mode 0755 and return
    /// the written path.
    pub fn export(
        &self,
        namespace: impl AsRef<str>,
        name: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, AssetError> {
        let bytes = self.open_bytes(namespace.as_ref(), name)?;
        let target = dest_dir.join(name);

        self.fs.write(&target, &bytes).map_err(|source| AssetError::Io {
            path: target.clone(),
            source,
        })?;
        self.fs
            .set_mode(&target, EXPORT_MODE)
            .map_err(|source| AssetError::Io {
                path: target.clone(),
                source,
            })?;

        info!(
            namespace = namespace.as_ref(),
            name,
            path = ?target,
            bytes = bytes.len(),
            "exported asset"
        );
        Ok(target)
    }

    /// SHA-256 of the resolved asset content, as lowercase hex.
    pub fn verify(&self, namespace: impl AsRef<str>, name: &str) -> Result<String, AssetError> {
        let namespace = namespace.as_ref();
        let mut reader = self.open(namespace, name)?;

        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| io_error(namespace, name, e.into()))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        let digest = format!("{:x}", hasher.finalize());
        debug!(namespace, name, digest = %digest, "computed asset checksum");
        Ok(digest)
    }

    fn override_namespace_dir(&self, namespace: &str) -> Option<PathBuf> {
        let dir = self.override_root.as_ref()?.join(namespace);
        self.fs.is_dir(&dir).then_some(dir)
    }

    fn override_path(&self, namespace: &str, name: &str) -> Option<PathBuf> {
        self.override_root
            .as_ref()
            .map(|root| root.join(namespace).join(name))
    }

    /// Collect every file below `dir` as a `/`-separated path relative to
    /// `root`. Unreadable and symlinked directories are skipped.
    fn walk_override(&self, root: &Path, dir: &Path, names: &mut BTreeSet<String>) {
        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = ?dir, error = %err, "skipping unreadable override directory");
                return;
            }
        };

        for entry in entries {
            if self.fs.is_dir(&entry) {
                if self.fs.is_symlink(&entry) {
                    debug!(dir = ?entry, "not following symlinked override directory");
                    continue;
                }
                self.walk_override(root, &entry, names);
            } else if self.fs.is_file(&entry) {
                if let Some(rel) = relative_name(root, &entry) {
                    names.insert(rel);
                }
            }
        }
    }
}

fn bundle_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// A non-empty relative path made only of normal components.
///
/// Anything else could escape the override root, so it never resolves.
fn is_clean_relative(name: &str) -> bool {
    !name.is_empty()
        && !name.split('/').any(str::is_empty)
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn not_found(namespace: &str, name: &str) -> AssetError {
    AssetError::NotFound {
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

fn io_error(namespace: &str, name: &str, source: anyhow::Error) -> AssetError {
    AssetError::Io {
        path: PathBuf::from(namespace).join(name),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn store_with(fs: &MockFileSystem, bundle: Bundle) -> AssetStore {
        AssetStore::with_filesystem(bundle, Some(PathBuf::from("/ovr")), Arc::new(fs.clone()))
    }

    #[test]
    fn override_wins_over_embedded() {
        let fs = MockFileSystem::new();
        fs.add_file("/ovr/scripts/hello.sh", b"echo override".to_vec());
        let store = store_with(&fs, Bundle::new().with_entry("scripts/hello.sh", b"echo embedded".to_vec()));

        assert_eq!(store.open_bytes("scripts", "hello.sh").unwrap(), b"echo override");
        assert_eq!(
            store.source_of("scripts", "hello.sh").unwrap(),
            AssetSource::Override(PathBuf::from("/ovr/scripts/hello.sh"))
        );
    }

    #[test]
    fn falls_back_to_embedded_per_entry() {
        let fs = MockFileSystem::new();
        fs.add_file("/ovr/scripts/a.sh", b"A".to_vec());
        let store = store_with(
            &fs,
            Bundle::new()
                .with_entry("scripts/a.sh", b"a".to_vec())
                .with_entry("scripts/b.sh", b"b".to_vec()),
        );

        assert_eq!(store.open_bytes("scripts", "a.sh").unwrap(), b"A");
        assert_eq!(store.open_bytes("scripts", "b.sh").unwrap(), b"b");
        assert_eq!(store.source_of("scripts", "b.sh").unwrap(), AssetSource::Embedded);
    }

    #[test]
    fn listing_does_not_follow_directory_links() {
        let fs = MockFileSystem::new();
        fs.add_file("/ovr/scripts/a.sh", b"A".to_vec());
        fs.add_symlink("/ovr/scripts/loop", "/ovr/scripts");
        fs.add_file("/ovr/shared/b.sh", b"B".to_vec());
        fs.add_symlink("/ovr/scripts/b.sh", "/ovr/shared/b.sh");
        let store = store_with(&fs, Bundle::new());

        assert_eq!(store.list("scripts"), vec!["a.sh".to_string(), "b.sh".to_string()]);
    }

    #[test]
    fn missing_everywhere_is_not_found() {
        let store = store_with(&MockFileSystem::new(), Bundle::new());
        let err = store.open("scripts", "nope.sh").err().unwrap();
        assert!(err.is_not_found());
        assert!(store.verify("scripts", "nope.sh").unwrap_err().is_not_found());
    }

    #[test]
    fn unknown_namespace_is_empty_not_an_error() {
        let store = AssetStore::new(Bundle::embedded(), None);
        assert!(store.list("plugins").is_empty());
        assert!(store.open("plugins", "x").err().unwrap().is_not_found());
    }

    #[test]
    fn traversal_names_never_resolve() {
        let fs = MockFileSystem::new();
        fs.add_file("/ovr/secret.txt", b"s".to_vec());
        let store = store_with(&fs, Bundle::new());

        for name in ["../secret.txt", "/etc/passwd", "a//b", "./x", ""] {
            assert!(store.open("scripts", name).err().unwrap().is_not_found(), "{name}");
        }
    }

    #[test]
    fn list_unions_nested_override_names() {
        let fs = MockFileSystem::new();
        fs.add_file("/ovr/workspaces/default/compose.yaml", b"o".to_vec());
        fs.add_file("/ovr/workspaces/lab/compose.yaml", b"l".to_vec());
        let store = store_with(
            &fs,
            Bundle::new()
                .with_entry("workspaces/default/compose.yaml", b"e".to_vec())
                .with_entry("workspaces/default/README.md", b"r".to_vec()),
        );

        assert_eq!(
            store.list("workspaces"),
            vec![
                "default/README.md".to_string(),
                "default/compose.yaml".to_string(),
                "lab/compose.yaml".to_string(),
            ]
        );
    }

    #[test]
    fn export_writes_executable_copy() {
        let fs = MockFileSystem::new();
        let store = store_with(&fs, Bundle::new().with_entry("scripts/tools/run.sh", b"echo run".to_vec()));

        let path = store.export("scripts", "tools/run.sh", Path::new("/out")).unwrap();
        assert_eq!(path, PathBuf::from("/out/tools/run.sh"));
        assert_eq!(fs.content(&path).unwrap(), b"echo run");
        assert_eq!(fs.mode(&path), Some(EXPORT_MODE));
    }

    #[test]
    fn verify_matches_known_digest() {
        let store = store_with(&MockFileSystem::new(), Bundle::new().with_entry("templates/empty", Vec::new()));
        assert_eq!(
            store.verify("templates", "empty").unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
