// src/exec/script.rs

//! Script execution through a [`ScriptEngine`].
//!
//! A run moves through
//! `Created -> Parsed -> {DryRunSkipped | Running -> {Completed | TimedOut |
//! Canceled | InterpreterFaulted}}`; dry-run skips straight from `Created`
//! without parsing. Every state after `Running` is terminal and a run is never
//! reused.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::engine::{EngineError, PosixShell, ScriptEngine};
use super::env;
use super::error::ExecError;
use super::io::{OutputSink, StdinPlan, StreamKind, Wiring};
use super::spec::{
    effective_dir, effective_timeout, ExecutionResult, ExecutionSpec, InputSource, EXIT_CANCELED,
    EXIT_TIMEOUT, EXIT_UNKNOWN,
};
use super::status;
use super::supervise::{supervise, Launch, RunOutcome, Supervised};
use crate::bufpool::BufferPool;

/// Options for a single script run.
///
/// Unset `stdin` reads the caller's stdin. Unset `stdout`/`stderr` go to the
/// caller's streams, or nowhere when `capture_output` is on. With capture on,
/// whatever destination is in effect also receives a copy, so a caller picks
/// capture-only, capture-and-forward or live-only by what it supplies.
#[derive(Debug, Default)]
pub struct ScriptOptions {
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    pub stdin: Option<InputSource>,
    pub stdout: Option<OutputSink>,
    pub stderr: Option<OutputSink>,
    pub timeout: Option<Duration>,
    pub dry_run: bool,
    pub capture_output: bool,
}

impl From<ExecutionSpec> for ScriptOptions {
    fn from(spec: ExecutionSpec) -> Self {
        Self {
            args: spec.args,
            env: spec.env,
            working_dir: spec.working_dir,
            stdin: spec.stdin,
            stdout: None,
            stderr: None,
            timeout: spec.timeout,
            dry_run: spec.dry_run,
            capture_output: spec.capture_output,
        }
    }
}

/// Lifecycle state of one script run, as reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptPhase {
    Created,
    Parsed,
    DryRunSkipped,
    Running,
    Completed,
    TimedOut,
    Canceled,
    InterpreterFaulted,
}

impl ScriptPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            ScriptPhase::Created | ScriptPhase::Parsed | ScriptPhase::Running
        )
    }
}

impl fmt::Display for ScriptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScriptPhase::Created => "created",
            ScriptPhase::Parsed => "parsed",
            ScriptPhase::DryRunSkipped => "dry-run-skipped",
            ScriptPhase::Running => "running",
            ScriptPhase::Completed => "completed",
            ScriptPhase::TimedOut => "timed-out",
            ScriptPhase::Canceled => "canceled",
            ScriptPhase::InterpreterFaulted => "interpreter-faulted",
        };
        f.write_str(s)
    }
}

/// Runs script text under the same timeout/cancel/capture/dry-run contract as
/// [`super::ProcessExecutor`].
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    engine: Arc<dyn ScriptEngine>,
    buffers: Option<BufferPool>,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new(Arc::new(PosixShell::default()))
    }
}

impl ScriptRunner {
    pub fn new(engine: Arc<dyn ScriptEngine>) -> Self {
        Self {
            engine,
            buffers: None,
        }
    }

    pub fn with_buffer_pool(mut self, pool: BufferPool) -> Self {
        self.buffers = Some(pool);
        self
    }

    pub fn engine(&self) -> &dyn ScriptEngine {
        self.engine.as_ref()
    }

    /// Read the script from `source`, parse it, and run it.
    ///
    /// On a non-zero script exit the error is [`ExecError::ScriptFailed`]
    /// carrying the script's own status; that is a script failure, not a
    /// tooling fault.
    pub async fn run<R>(
        &self,
        name: &str,
        mut source: R,
        options: ScriptOptions,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, ExecError>
    where
        R: Read + Send + 'static,
    {
        debug!(script = name, phase = %ScriptPhase::Created, "script run created");

        if options.dry_run {
            debug!(script = name, phase = %ScriptPhase::DryRunSkipped, "dry-run; not parsing or executing");
            return Ok(ExecutionResult::default());
        }

        let text = tokio::task::spawn_blocking(move || {
            let mut text = String::new();
            source.read_to_string(&mut text).map(|_| text)
        })
        .await
        .map_err(|e| interpreter_fault(name, &e))?
        .map_err(|e| ExecError::ScriptParse {
            name: name.to_string(),
            message: format!("read script: {e}"),
        })?;

        let script = self
            .engine
            .parse(name, text)
            .await
            .map_err(|e| match e {
                EngineError::Syntax(message) => ExecError::ScriptParse {
                    name: name.to_string(),
                    message,
                },
                other @ EngineError::Unavailable(_) => interpreter_fault(name, &other),
            })?;
        debug!(script = name, phase = %ScriptPhase::Parsed, "script parsed");

        let timeout = effective_timeout(options.timeout);
        let envs = env::assemble(&options.env).map_err(|e| interpreter_fault(name, &e))?;

        let mut command = self.engine.command(&script, &options.args);
        command.env_clear().envs(envs);
        if let Some(dir) = effective_dir(options.working_dir.as_deref()) {
            command.current_dir(dir);
        }

        let capture = options.capture_output;
        let launch = Launch {
            command,
            stdin: StdinPlan::from_source(options.stdin.unwrap_or(InputSource::Inherit)),
            stdout: Wiring::resolve(default_sink(options.stdout, capture), capture, StreamKind::Stdout),
            stderr: Wiring::resolve(default_sink(options.stderr, capture), capture, StreamKind::Stderr),
            timeout,
            pool: self.buffers.clone(),
        };

        info!(
            script = name,
            args = ?options.args,
            ?timeout,
            capture,
            phase = %ScriptPhase::Running,
            "running script"
        );

        let supervised = supervise(launch, name, cancel)
            .await
            .map_err(|e| interpreter_fault(name, &e))?;

        let (phase, outcome) = normalize(name, timeout.unwrap_or_default(), supervised);
        match &outcome {
            Ok(res) => info!(script = name, %phase, duration = ?res.duration, "script finished"),
            Err(err) if err.is_tooling_fault() => warn!(script = name, %phase, error = %err, "script run faulted"),
            Err(err) => info!(script = name, %phase, exit_code = err.exit_code(), "script did not succeed"),
        }
        outcome
    }
}

fn default_sink(sink: Option<OutputSink>, capture: bool) -> OutputSink {
    sink.unwrap_or(if capture {
        OutputSink::Discard
    } else {
        OutputSink::Inherit
    })
}

fn interpreter_fault(name: &str, err: &dyn fmt::Display) -> ExecError {
    ExecError::Interpreter {
        name: name.to_string(),
        message: err.to_string(),
        result: ExecutionResult {
            exit_code: EXIT_UNKNOWN,
            ..ExecutionResult::default()
        },
    }
}

/// Map how the run ended onto an exit code and error, in precedence order:
/// deadline, cancellation, the script's own status, then interpreter faults.
pub(crate) fn normalize(
    name: &str,
    timeout: Duration,
    supervised: Supervised,
) -> (ScriptPhase, Result<ExecutionResult, ExecError>) {
    let mut result = ExecutionResult {
        stdout: supervised.stdout.text(),
        stderr: supervised.stderr.text(),
        exit_code: 0,
        duration: supervised.duration,
    };
    if supervised.stdout.abandoned || supervised.stderr.abandoned {
        debug!(script = name, "output may be incomplete; a descendant kept a pipe open");
    }
    let stream_error = supervised.stdout.error.or(supervised.stderr.error);

    match supervised.outcome {
        RunOutcome::TimedOut => {
            result.exit_code = EXIT_TIMEOUT;
            (
                ScriptPhase::TimedOut,
                Err(ExecError::Timeout {
                    target: name.to_string(),
                    timeout,
                    result,
                }),
            )
        }
        RunOutcome::Canceled => {
            result.exit_code = EXIT_CANCELED;
            (
                ScriptPhase::Canceled,
                Err(ExecError::Canceled {
                    target: name.to_string(),
                    result,
                }),
            )
        }
        RunOutcome::Exited(exit) => {
            if let Some(e) = stream_error {
                result.exit_code = EXIT_UNKNOWN;
                return (
                    ScriptPhase::InterpreterFaulted,
                    Err(ExecError::Interpreter {
                        name: name.to_string(),
                        message: format!("script output stream failed: {e}"),
                        result,
                    }),
                );
            }

            let code = status::exit_code(exit);
            result.exit_code = code;
            if code == 0 {
                (ScriptPhase::Completed, Ok(result))
            } else {
                (
                    ScriptPhase::Completed,
                    Err(ExecError::ScriptFailed {
                        name: name.to_string(),
                        status: code,
                        result,
                    }),
                )
            }
        }
        RunOutcome::Faulted(e) => {
            result.exit_code = EXIT_UNKNOWN;
            (
                ScriptPhase::InterpreterFaulted,
                Err(ExecError::Interpreter {
                    name: name.to_string(),
                    message: format!("waiting for interpreter: {e}"),
                    result,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bufpool::PooledBuffer;
    use crate::exec::io::Drained;
    use std::io;

    fn drained(text: &str) -> Drained {
        let mut buf = PooledBuffer::unpooled();
        buf.extend_from_slice(text.as_bytes());
        Drained {
            captured: Some(buf),
            error: None,
            abandoned: false,
        }
    }

    fn supervised(outcome: RunOutcome) -> Supervised {
        Supervised {
            outcome,
            stdout: drained("partial"),
            stderr: Drained::default(),
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn timeout_keeps_partial_output() {
        let (phase, res) = normalize("s.sh", Duration::from_millis(50), supervised(RunOutcome::TimedOut));
        assert_eq!(phase, ScriptPhase::TimedOut);
        let err = res.unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert_eq!(err.exit_code(), EXIT_TIMEOUT);
        assert_eq!(err.result().unwrap().stdout, "partial");
    }

    #[test]
    fn cancellation_uses_its_own_sentinel() {
        let (phase, res) = normalize("s.sh", Duration::ZERO, supervised(RunOutcome::Canceled));
        assert_eq!(phase, ScriptPhase::Canceled);
        assert_eq!(res.unwrap_err().exit_code(), EXIT_CANCELED);
    }

    #[test]
    fn wait_failure_is_an_interpreter_fault() {
        let (phase, res) = normalize(
            "s.sh",
            Duration::ZERO,
            supervised(RunOutcome::Faulted(io::Error::other("boom"))),
        );
        assert_eq!(phase, ScriptPhase::InterpreterFaulted);
        let err = res.unwrap_err();
        assert!(err.is_tooling_fault());
        assert_eq!(err.exit_code(), EXIT_UNKNOWN);
    }

    #[cfg(unix)]
    #[test]
    fn script_status_is_surfaced_verbatim() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        let (phase, res) = normalize(
            "s.sh",
            Duration::ZERO,
            supervised(RunOutcome::Exited(ExitStatus::from_raw(7 << 8))),
        );
        assert_eq!(phase, ScriptPhase::Completed);
        let err = res.unwrap_err();
        assert!(matches!(err, ExecError::ScriptFailed { status: 7, .. }));
        assert!(!err.is_tooling_fault());
    }

    #[cfg(unix)]
    #[test]
    fn output_read_failure_is_an_interpreter_fault() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        let mut run = supervised(RunOutcome::Exited(ExitStatus::from_raw(0)));
        run.stderr.error = Some(io::Error::other("pipe broke"));
        let (phase, res) = normalize("s.sh", Duration::ZERO, run);
        assert_eq!(phase, ScriptPhase::InterpreterFaulted);
        let err = res.unwrap_err();
        assert!(err.is_tooling_fault());
        assert_eq!(err.result().unwrap().stdout, "partial");
    }

    #[cfg(unix)]
    #[test]
    fn abandoned_pipe_after_clean_exit_still_succeeds() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        let mut run = supervised(RunOutcome::Exited(ExitStatus::from_raw(0)));
        run.stdout.abandoned = true;
        let (phase, res) = normalize("s.sh", Duration::ZERO, run);
        assert_eq!(phase, ScriptPhase::Completed);
        assert_eq!(res.unwrap().stdout, "partial");
    }

    #[test]
    fn terminal_phases() {
        assert!(!ScriptPhase::Created.is_terminal());
        assert!(!ScriptPhase::Running.is_terminal());
        assert!(ScriptPhase::DryRunSkipped.is_terminal());
        assert!(ScriptPhase::InterpreterFaulted.is_terminal());
    }
}
