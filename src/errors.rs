// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::assets::AssetError;
use crate::exec::ExecError;

#[derive(Error, Debug)]
pub enum HomekitError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HomekitError {
    /// Exit code the binary should terminate with for this error.
    ///
    /// Execution errors forward the (sentinel or child) exit code; anything
    /// else is a plain failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            HomekitError::Exec(err) => err.exit_code(),
            _ => 1,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HomekitError>;
