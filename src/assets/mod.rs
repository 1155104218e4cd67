// src/assets/mod.rs

//! Asset resolution layer.
//!
//! Named scripts, templates and workspace files come either from the
//! build-time [`Bundle`] or from a user-supplied override directory laid out
//! as `<override>/<namespace>/<name>`. The override always wins for the entry
//! it provides; nothing is ever merged.

pub mod bundle;
pub mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use bundle::Bundle;
pub use store::{AssetSource, AssetStore};

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset not found: {namespace}/{name}")]
    NotFound { namespace: String, name: String },

    #[error("asset IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl AssetError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::NotFound { .. })
    }
}
