// src/exec/engine.rs

//! The interpreter behind the script runner.
//!
//! The runner treats the engine as an opaque capability: turn script text
//! into a [`Script`], then produce a command that executes it. Timeouts,
//! cancellation, stream wiring and outcome normalisation stay in the runner.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The script text is malformed. Nothing was executed.
    #[error("{0}")]
    Syntax(String),

    /// The engine itself could not be used.
    #[error("interpreter unavailable: {0}")]
    Unavailable(#[source] io::Error),
}

/// Script text that passed the engine's syntax check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    name: String,
    source: String,
}

impl Script {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

pub type ParseFuture<'a> = Pin<Box<dyn Future<Output = Result<Script, EngineError>> + Send + 'a>>;

/// A script interpreter.
pub trait ScriptEngine: Send + Sync + fmt::Debug {
    /// Check `source` without running it.
    fn parse<'a>(&'a self, name: &'a str, source: String) -> ParseFuture<'a>;

    /// A command that runs `script` with positional parameters `args`.
    ///
    /// Environment, working directory and stdio are applied by the caller.
    fn command(&self, script: &Script, args: &[String]) -> Command;
}

/// POSIX `sh` as the script engine.
///
/// Parsing is `sh -n` (read commands, execute nothing). Running is
/// `sh -c <source> <name> <args...>`, so `$0` is the script name and `$1..`
/// are the arguments.
#[derive(Debug, Clone)]
pub struct PosixShell {
    program: PathBuf,
}

impl PosixShell {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

impl Default for PosixShell {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl ScriptEngine for PosixShell {
    fn parse<'a>(&'a self, name: &'a str, source: String) -> ParseFuture<'a> {
        Box::pin(async move {
            let output = Command::new(&self.program)
                .arg("-n")
                .arg("-c")
                .arg(&source)
                .arg(name)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output()
                .await;

            let output = match output {
                Ok(output) => output,
                // Arguments with interior NUL bytes are rejected at spawn.
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                    return Err(EngineError::Syntax(
                        "script contains a NUL byte".to_string(),
                    ));
                }
                Err(e) => return Err(EngineError::Unavailable(e)),
            };

            if !output.status.success() {
                let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let message = if message.is_empty() {
                    format!("syntax check exited with {}", output.status)
                } else {
                    message
                };
                return Err(EngineError::Syntax(message));
            }

            debug!(script = name, bytes = source.len(), "script parsed");
            Ok(Script {
                name: name.to_string(),
                source,
            })
        })
    }

    fn command(&self, script: &Script, args: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-c")
            .arg(&script.source)
            .arg(&script.name)
            .args(args);
        command
    }
}
