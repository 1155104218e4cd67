// src/assets/bundle.rs

use std::borrow::Cow;
use std::collections::BTreeMap;

/// Files compiled into the binary, keyed by `namespace/name`.
static EMBEDDED: &[(&str, &[u8])] = &[
    (
        "scripts/ensure-dirs.sh",
        include_bytes!("../../assets/scripts/ensure-dirs.sh"),
    ),
    ("scripts/hello.sh", include_bytes!("../../assets/scripts/hello.sh")),
    (
        "scripts/system-info.sh",
        include_bytes!("../../assets/scripts/system-info.sh"),
    ),
    ("templates/env.tmpl", include_bytes!("../../assets/templates/env.tmpl")),
    (
        "templates/service.yaml.tmpl",
        include_bytes!("../../assets/templates/service.yaml.tmpl"),
    ),
    (
        "workspaces/default/README.md",
        include_bytes!("../../assets/workspaces/default/README.md"),
    ),
    (
        "workspaces/default/compose.yaml",
        include_bytes!("../../assets/workspaces/default/compose.yaml"),
    ),
];

/// Read-only collection of bundled asset bytes.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    entries: BTreeMap<String, Cow<'static, [u8]>>,
}

impl Bundle {
    /// An empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundle shipped with this binary.
    pub fn embedded() -> Self {
        let entries = EMBEDDED
            .iter()
            .map(|(path, bytes)| (path.to_string(), Cow::Borrowed(*bytes)))
            .collect();
        Self { entries }
    }

    pub fn with_entry(
        mut self,
        path: impl Into<String>,
        bytes: impl Into<Cow<'static, [u8]>>,
    ) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Cow<'static, [u8]>>) {
        self.entries.insert(path.into(), bytes.into());
    }

    pub fn get(&self, path: &str) -> Option<&Cow<'static, [u8]>> {
        self.entries.get(path)
    }

    /// Relative names of every entry stored under `namespace/`.
    pub fn names_under<'a>(&'a self, namespace: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        let prefix = format!("{namespace}/");
        let skip = prefix.len();
        self.entries
            .range(prefix.clone()..)
            .map(|(path, _)| path.as_str())
            .take_while(move |path| path.starts_with(&prefix))
            .map(move |path| &path[skip..])
            .filter(|name| !name.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
