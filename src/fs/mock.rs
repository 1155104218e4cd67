// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, mode: u32 },
    Dir(Vec<String>), // List of child names
    Link(PathBuf),
}

/// Link hops followed before a path counts as dangling.
const MAX_LINK_HOPS: usize = 40;

/// In-memory filesystem for tests.
///
/// Clones share the same tree, so a test can keep one handle for inspection
/// while the store under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.entries();
        files.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                mode: 0o644,
            },
        );
        link_into_parent(&mut files, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.entries();
        ensure_dir_entry(&mut files, path.as_ref());
    }

    /// Create a symbolic link at `path` pointing to the absolute `target`.
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.entries();
        files.insert(path.clone(), MockEntry::Link(target.as_ref().to_path_buf()));
        link_into_parent(&mut files, &path);
    }

    /// Permission bits of a file, if it exists.
    pub fn mode(&self, path: impl AsRef<Path>) -> Option<u32> {
        match self.entries().get(path.as_ref()) {
            Some(MockEntry::File { mode, .. }) => Some(*mode),
            _ => None,
        }
    }

    /// Raw content of a file, if it exists.
    pub fn content(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.entries().get(path.as_ref()) {
            Some(MockEntry::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }
}

/// The entry `path` names after following links.
fn resolve<'a>(files: &'a HashMap<PathBuf, MockEntry>, path: &Path) -> Option<&'a MockEntry> {
    let mut entry = files.get(path)?;
    for _ in 0..MAX_LINK_HOPS {
        match entry {
            MockEntry::Link(target) => entry = files.get(target)?,
            other => return Some(other),
        }
    }
    None
}

fn parent_of(path: &Path) -> Option<&Path> {
    path.parent().map(|parent| {
        if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        }
    })
}

/// Register `path` as a child of its parent directory, creating parents.
fn link_into_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = parent_of(path) else {
        return;
    };
    if parent == path {
        return;
    }
    ensure_dir_entry(files, parent);
    if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if files.contains_key(path) {
        return;
    }
    files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    link_into_parent(files, path);
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let files = self.entries();
        match resolve(&files, path) {
            Some(MockEntry::File { content, .. }) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(_) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if matches!(self.entries().get(path), Some(MockEntry::Dir(_) | MockEntry::Link(_))) {
            return Err(anyhow!("Not a regular file: {:?}", path));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(resolve(&self.entries(), path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(resolve(&self.entries(), path), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::Link(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.entries();
        match resolve(&files, path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn set_mode(&self, path: &Path, new_mode: u32) -> Result<()> {
        match self.entries().get_mut(path) {
            Some(MockEntry::File { mode, .. }) => {
                *mode = new_mode;
                Ok(())
            }
            _ => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_files_create_parent_dirs() {
        let fs = MockFileSystem::new();
        fs.add_file("/ovr/scripts/tools/a.sh", b"echo a".to_vec());

        assert!(fs.is_dir(Path::new("/ovr")));
        assert!(fs.is_dir(Path::new("/ovr/scripts/tools")));
        assert!(fs.is_file(Path::new("/ovr/scripts/tools/a.sh")));
        assert_eq!(
            fs.read_dir(Path::new("/ovr/scripts")).unwrap(),
            vec![PathBuf::from("/ovr/scripts/tools")]
        );
    }

    #[test]
    fn set_mode_is_recorded() {
        let fs = MockFileSystem::new();
        fs.write(Path::new("out/run.sh"), b"#!/bin/sh").unwrap();
        assert_eq!(fs.mode("out/run.sh"), Some(0o644));

        fs.set_mode(Path::new("out/run.sh"), 0o755).unwrap();
        assert_eq!(fs.mode("out/run.sh"), Some(0o755));
        assert!(fs.set_mode(Path::new("out/missing"), 0o755).is_err());
    }

    #[test]
    fn links_are_followed_but_reported() {
        let fs = MockFileSystem::new();
        fs.add_file("/ovr/scripts/a.sh", b"echo a".to_vec());
        fs.add_symlink("/ovr/scripts/again", "/ovr/scripts");
        fs.add_symlink("/ovr/loop", "/ovr/loop");

        assert!(fs.is_symlink(Path::new("/ovr/scripts/again")));
        assert!(fs.is_dir(Path::new("/ovr/scripts/again")));
        assert!(!fs.is_symlink(Path::new("/ovr/scripts")));
        assert!(!fs.is_dir(Path::new("/ovr/loop")));
        assert!(!fs.is_file(Path::new("/ovr/loop")));
    }
}
