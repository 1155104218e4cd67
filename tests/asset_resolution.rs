// tests/asset_resolution.rs

use std::error::Error;
use std::sync::Arc;

use homekit::assets::{AssetSource, AssetStore, Bundle};
use homekit::fs::mock::MockFileSystem;
use homekit_test_utils::builders::{mock_store, BundleBuilder, OverrideTree};
use proptest::prelude::*;

type TestResult = Result<(), Box<dyn Error>>;

fn sample_bundle() -> Bundle {
    BundleBuilder::new()
        .file("scripts/hello.sh", "echo embedded hello")
        .file("scripts/bye.sh", "echo embedded bye")
        .file("templates/env.tmpl", "KEY=value")
        .build()
}

#[test]
fn override_on_disk_shadows_embedded_content() -> TestResult {
    let tree = OverrideTree::new();
    let path = tree.file("scripts", "hello.sh", "echo override hello");
    let store = tree.store(sample_bundle());

    assert_eq!(store.open_bytes("scripts", "hello.sh")?, b"echo override hello");
    assert_eq!(store.source_of("scripts", "hello.sh")?, AssetSource::Override(path));
    assert_eq!(store.open_bytes("scripts", "bye.sh")?, b"echo embedded bye");
    Ok(())
}

#[test]
fn missing_override_directory_means_embedded_only() -> TestResult {
    let tree = OverrideTree::new();
    let store = AssetStore::new(sample_bundle(), Some(tree.root().join("does-not-exist")));

    assert_eq!(store.list("scripts"), vec!["bye.sh".to_string(), "hello.sh".to_string()]);
    assert_eq!(store.source_of("templates", "env.tmpl")?, AssetSource::Embedded);
    Ok(())
}

#[test]
fn list_is_sorted_and_deduplicated() {
    let tree = OverrideTree::new();
    tree.file("scripts", "hello.sh", "o");
    tree.file("scripts", "extra.sh", "o");
    tree.file("scripts", "nested/deep.sh", "o");
    let store = tree.store(sample_bundle());

    assert_eq!(
        store.list("scripts"),
        vec![
            "bye.sh".to_string(),
            "extra.sh".to_string(),
            "hello.sh".to_string(),
            "nested/deep.sh".to_string(),
        ]
    );
    assert!(store.list("workspaces").is_empty());
}

#[cfg(unix)]
#[test]
fn export_produces_an_executable_copy_that_reads_back() -> TestResult {
    use std::os::unix::fs::PermissionsExt;

    let tree = OverrideTree::new();
    tree.file("scripts", "hello.sh", "echo override hello");
    let store = tree.store(sample_bundle());
    let dest = tempfile::tempdir()?;

    let written = store.export("scripts", "hello.sh", dest.path())?;
    assert_eq!(written, dest.path().join("hello.sh"));
    assert_eq!(std::fs::read(&written)?, b"echo override hello");
    assert_eq!(std::fs::metadata(&written)?.permissions().mode() & 0o777, 0o755);
    Ok(())
}

#[test]
fn verify_is_stable_and_tracks_content() -> TestResult {
    let tree = OverrideTree::new();
    let store = tree.store(sample_bundle());

    let embedded = store.verify("scripts", "hello.sh")?;
    assert_eq!(embedded, store.verify("scripts", "hello.sh")?);
    assert_eq!(embedded.len(), 64);
    assert!(embedded.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    tree.file("scripts", "hello.sh", "echo embedded hellO");
    let changed = store.verify("scripts", "hello.sh")?;
    assert_ne!(embedded, changed);
    Ok(())
}

#[test]
fn embedded_bundle_ships_the_helper_scripts() -> TestResult {
    let store = AssetStore::new(Bundle::embedded(), None);
    let scripts = store.list("scripts");
    assert!(scripts.contains(&"hello.sh".to_string()), "{scripts:?}");
    assert!(!store.open_bytes("scripts", "hello.sh")?.is_empty());
    Ok(())
}

fn asset_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(\\.sh)?"
}

proptest! {
    // The override copy is returned exactly when the override file exists.
    #[test]
    fn resolution_prefers_override_when_present(
        name in asset_name(),
        embedded in proptest::collection::vec(any::<u8>(), 0..64),
        overridden in proptest::option::of(proptest::collection::vec(any::<u8>(), 0..64)),
    ) {
        let fs = Arc::new(MockFileSystem::new());
        if let Some(ref bytes) = overridden {
            fs.add_file(format!("/ovr/scripts/{name}"), bytes.clone());
        }
        let bundle = Bundle::new().with_entry(format!("scripts/{name}"), embedded.clone());
        let store = mock_store(bundle, fs);

        let expected = overridden.unwrap_or(embedded);
        prop_assert_eq!(store.open_bytes("scripts", &name).unwrap(), expected);
    }

    // Names listed are exactly the union of both sources.
    #[test]
    fn list_is_the_union_of_both_sources(
        embedded in proptest::collection::btree_set(asset_name(), 0..6),
        overridden in proptest::collection::btree_set(asset_name(), 0..6),
    ) {
        let fs = Arc::new(MockFileSystem::new());
        for name in &overridden {
            fs.add_file(format!("/ovr/templates/{name}"), b"o".to_vec());
        }
        let mut bundle = Bundle::new();
        for name in &embedded {
            bundle.insert(format!("templates/{name}"), b"e".to_vec());
        }
        let store = mock_store(bundle, fs);

        let expected: Vec<String> = embedded.union(&overridden).cloned().collect();
        prop_assert_eq!(store.list("templates"), expected);
    }

    // Same content, same digest, whichever source serves it.
    #[test]
    fn digest_depends_only_on_content(content in proptest::collection::vec(any::<u8>(), 0..256)) {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/ovr/templates/over", content.clone());
        let bundle = Bundle::new().with_entry("templates/emb", content);
        let store = mock_store(bundle, fs);

        prop_assert_eq!(
            store.verify("templates", "over").unwrap(),
            store.verify("templates", "emb").unwrap()
        );
    }
}

#[cfg(unix)]
#[test]
fn symlinked_directory_loop_is_listed_once() -> TestResult {
    let tree = OverrideTree::new();
    tree.file("scripts", "a.sh", "echo a");
    let scripts = tree.root().join("scripts");
    std::os::unix::fs::symlink(&scripts, scripts.join("loop"))?;
    let store = tree.store(Bundle::new());

    assert_eq!(store.list("scripts"), vec!["a.sh".to_string()]);
    Ok(())
}
