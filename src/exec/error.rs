// src/exec/error.rs

use std::io;
use std::time::Duration;

use thiserror::Error;

use super::spec::{ExecutionResult, EXIT_UNKNOWN};

/// Every way a process or script run can end other than plain success.
///
/// Variants raised after the run started carry the result gathered so far,
/// including any partial captured output.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("invalid execution spec: {0}")]
    InvalidSpec(String),

    #[error("failed to start '{target}': {source}")]
    Spawn {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("command '{target}' failed with exit status {status}")]
    CommandFailed {
        target: String,
        status: i32,
        result: ExecutionResult,
    },

    #[error("parse script {name}: {message}")]
    ScriptParse { name: String, message: String },

    #[error("script {name} exited with status {status}")]
    ScriptFailed {
        name: String,
        status: i32,
        result: ExecutionResult,
    },

    #[error("'{target}' timed out after {timeout:?}")]
    Timeout {
        target: String,
        timeout: Duration,
        result: ExecutionResult,
    },

    #[error("'{target}' was canceled")]
    Canceled {
        target: String,
        result: ExecutionResult,
    },

    #[error("reading output of '{target}' failed: {source}")]
    Output {
        target: String,
        #[source]
        source: io::Error,
        result: ExecutionResult,
    },

    #[error("interpreter: {message}")]
    Interpreter {
        name: String,
        message: String,
        result: ExecutionResult,
    },
}

impl ExecError {
    /// The (possibly partial) result of a run that got under way.
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            ExecError::CommandFailed { result, .. }
            | ExecError::ScriptFailed { result, .. }
            | ExecError::Timeout { result, .. }
            | ExecError::Canceled { result, .. }
            | ExecError::Output { result, .. }
            | ExecError::Interpreter { result, .. } => Some(result),
            ExecError::InvalidSpec(_) | ExecError::Spawn { .. } | ExecError::ScriptParse { .. } => {
                None
            }
        }
    }

    pub fn into_result(self) -> Option<ExecutionResult> {
        match self {
            ExecError::CommandFailed { result, .. }
            | ExecError::ScriptFailed { result, .. }
            | ExecError::Timeout { result, .. }
            | ExecError::Canceled { result, .. }
            | ExecError::Output { result, .. }
            | ExecError::Interpreter { result, .. } => Some(result),
            ExecError::InvalidSpec(_) | ExecError::Spawn { .. } | ExecError::ScriptParse { .. } => {
                None
            }
        }
    }

    /// Exit code to report for this outcome.
    pub fn exit_code(&self) -> i32 {
        self.result().map_or(EXIT_UNKNOWN, |r| r.exit_code)
    }

    /// True for faults in the tooling itself, as opposed to a child or script
    /// that ran and reported failure.
    pub fn is_tooling_fault(&self) -> bool {
        matches!(
            self,
            ExecError::Spawn { .. } | ExecError::Output { .. } | ExecError::Interpreter { .. }
        )
    }

    /// True when the run was cut short and its output is incomplete.
    pub fn is_aborted(&self) -> bool {
        matches!(self, ExecError::Timeout { .. } | ExecError::Canceled { .. })
    }
}
