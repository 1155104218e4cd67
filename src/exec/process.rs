// src/exec/process.rs

//! External process execution.

use std::io;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::env;
use super::error::ExecError;
use super::io::{OutputSink, StdinPlan, StreamKind, Wiring};
use super::spec::{EXIT_CANCELED, EXIT_TIMEOUT, EXIT_UNKNOWN, ExecutionResult, ExecutionSpec, InputSource};
use super::status;
use super::supervise::{Launch, RunOutcome, Supervised, supervise};
use crate::bufpool::BufferPool;

/// Runs an executable with args, environment and working directory from an
/// [`ExecutionSpec`].
///
/// Without capture, the child writes straight to the caller's stdout/stderr.
/// Stdin defaults to an empty stream.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    buffers: Option<BufferPool>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture output into buffers lent from `pool`.
    pub fn with_buffer_pool(pool: BufferPool) -> Self {
        Self {
            buffers: Some(pool),
        }
    }

    pub async fn run(
        &self,
        spec: ExecutionSpec,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, ExecError> {
        if spec.target.is_empty() {
            return Err(ExecError::InvalidSpec(
                "exec: command must be specified".to_string(),
            ));
        }

        if spec.dry_run {
            debug!(target_cmd = %spec.target, "dry-run; not executing");
            return Ok(ExecutionResult::default());
        }

        let timeout = spec.effective_timeout();
        let target = spec.target.clone();

        let envs = env::assemble(&spec.env).map_err(|e| ExecError::Spawn {
            target: target.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })?;

        let mut command = Command::new(&spec.target);
        command.args(&spec.args).env_clear().envs(envs);
        if let Some(dir) = spec.effective_dir() {
            command.current_dir(dir);
        }

        let launch = Launch {
            command,
            stdin: StdinPlan::from_source(spec.stdin.unwrap_or(InputSource::Null)),
            stdout: Wiring::resolve(output_sink(spec.capture_output), spec.capture_output, StreamKind::Stdout),
            stderr: Wiring::resolve(output_sink(spec.capture_output), spec.capture_output, StreamKind::Stderr),
            timeout,
            pool: self.buffers.clone(),
        };

        info!(target_cmd = %target, args = ?spec.args, ?timeout, capture = spec.capture_output, "running command");

        let supervised = supervise(launch, &target, cancel)
            .await
            .map_err(|source| ExecError::Spawn {
                target: target.clone(),
                source,
            })?;

        interpret(target, timeout.unwrap_or_default(), supervised)
    }
}

/// Captured output goes only to memory; otherwise the child inherits the
/// caller's streams.
fn output_sink(capture: bool) -> OutputSink {
    if capture {
        OutputSink::Discard
    } else {
        OutputSink::Inherit
    }
}

fn interpret(
    target: String,
    timeout: std::time::Duration,
    supervised: Supervised,
) -> Result<ExecutionResult, ExecError> {
    let mut result = ExecutionResult {
        stdout: supervised.stdout.text(),
        stderr: supervised.stderr.text(),
        exit_code: 0,
        duration: supervised.duration,
    };

    if supervised.stdout.abandoned || supervised.stderr.abandoned {
        debug!(target_cmd = %target, "output may be incomplete; a descendant kept a pipe open");
    }
    let stream_error = supervised.stdout.error.or(supervised.stderr.error);

    match supervised.outcome {
        RunOutcome::Exited(exit) => {
            if let Some(source) = stream_error {
                result.exit_code = EXIT_UNKNOWN;
                warn!(target_cmd = %target, error = %source, "reading command output failed");
                return Err(ExecError::Output {
                    target,
                    source,
                    result,
                });
            }

            let code = status::exit_code(exit);
            result.exit_code = code;
            if code == 0 {
                info!(target_cmd = %target, duration = ?result.duration, "command succeeded");
                Ok(result)
            } else {
                info!(target_cmd = %target, exit_code = code, "command exited non-zero");
                Err(ExecError::CommandFailed {
                    target,
                    status: code,
                    result,
                })
            }
        }
        RunOutcome::TimedOut => {
            warn!(target_cmd = %target, ?timeout, "command timed out; killed");
            result.exit_code = EXIT_TIMEOUT;
            Err(ExecError::Timeout {
                target,
                timeout,
                result,
            })
        }
        RunOutcome::Canceled => {
            warn!(target_cmd = %target, "command canceled; killed");
            result.exit_code = EXIT_CANCELED;
            Err(ExecError::Canceled { target, result })
        }
        RunOutcome::Faulted(source) => Err(ExecError::Spawn { target, source }),
    }
}
