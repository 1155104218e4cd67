// src/config/mod.rs

//! Configuration loading and validation for homekit.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and overlay `HOMEKIT_*` variables
//!   (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{Config, RawConfig};
pub use validate::validate_config;
