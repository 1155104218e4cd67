// src/exec/env.rs

//! Environment assembly for child processes.

use std::ffi::OsString;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EnvError {
    #[error("environment variable name is empty")]
    EmptyKey,

    #[error("environment variable name '{0}' contains '=' or NUL")]
    InvalidKey(String),

    #[error("value of environment variable '{0}' contains NUL")]
    InvalidValue(String),
}

/// The inherited process environment with `overrides` applied in order.
///
/// An override replaces an inherited variable of the same name in place; a
/// repeated override key resolves to the last value given.
pub fn assemble(overrides: &[(String, String)]) -> Result<Vec<(OsString, OsString)>, EnvError> {
    assemble_onto(std::env::vars_os().collect(), overrides)
}

pub(crate) fn assemble_onto(
    mut base: Vec<(OsString, OsString)>,
    overrides: &[(String, String)],
) -> Result<Vec<(OsString, OsString)>, EnvError> {
    for (key, value) in overrides {
        validate(key, value)?;
        let key_os = OsString::from(key);
        match base.iter_mut().find(|(k, _)| *k == key_os) {
            Some(slot) => slot.1 = OsString::from(value),
            None => base.push((key_os, OsString::from(value))),
        }
    }
    Ok(base)
}

fn validate(key: &str, value: &str) -> Result<(), EnvError> {
    if key.is_empty() {
        return Err(EnvError::EmptyKey);
    }
    if key.contains(['=', '\0']) {
        return Err(EnvError::InvalidKey(key.to_string()));
    }
    if value.contains('\0') {
        return Err(EnvError::InvalidValue(key.to_string()));
    }
    Ok(())
}

/// Parse `KEY=VALUE` strings from the command line.
///
/// Splits on the first `=`, trims both halves, and skips entries whose key is
/// empty. An entry without `=` yields an empty value.
pub fn parse_pairs<I, S>(values: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .filter_map(|kv| {
            let kv = kv.as_ref();
            let (key, value) = kv.split_once('=').unwrap_or((kv, ""));
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}
