// src/dispatch.rs

//! Routes an execution request to the script runner or the process executor.

use std::io::{self, Write};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::assets::AssetStore;
use crate::errors::Result;
use crate::exec::{ExecError, ExecutionResult, ExecutionSpec, ExecutorBackend, ScriptOptions};
use crate::types::AssetNamespace;

/// What to run.
#[derive(Debug)]
pub enum Request {
    /// An external executable named by `spec.target`.
    Process(ExecutionSpec),
    /// A script shipped under the `scripts` namespace of the asset store.
    Embedded { name: String, options: ScriptOptions },
}

impl Request {
    /// Run `spec.target` as an embedded script, keeping the rest of `spec`.
    pub fn embedded(spec: ExecutionSpec) -> Self {
        let name = spec.target.clone();
        Request::Embedded {
            name,
            options: ScriptOptions::from(spec),
        }
    }

    fn label(&self) -> &str {
        match self {
            Request::Process(spec) => &spec.target,
            Request::Embedded { name, .. } => name,
        }
    }
}

pub struct Dispatcher<'a, B: ExecutorBackend + ?Sized> {
    assets: &'a AssetStore,
    backend: &'a B,
}

impl<'a, B: ExecutorBackend + ?Sized> Dispatcher<'a, B> {
    pub fn new(assets: &'a AssetStore, backend: &'a B) -> Self {
        Self { assets, backend }
    }

    /// Carry out `request`. Embedded scripts are resolved through the asset
    /// store first, so a missing script is an asset error rather than an
    /// execution one.
    pub async fn dispatch(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        debug!(request = request.label(), "dispatching");

        match request {
            Request::Process(spec) => Ok(self.backend.run_process(spec, cancel).await?),
            Request::Embedded { name, options } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ExecError::InvalidSpec("embedded script name is empty".into()).into());
                }
                let source = self.assets.open(AssetNamespace::Scripts, name)?;
                Ok(self.backend.run_script(name, source, options, cancel).await?)
            }
        }
    }
}

/// Write the captured output of `result` to `out` and `err`.
pub fn report<O, E>(result: &ExecutionResult, out: &mut O, err: &mut E) -> io::Result<()>
where
    O: Write + ?Sized,
    E: Write + ?Sized,
{
    if !result.stdout.is_empty() {
        out.write_all(result.stdout.as_bytes())?;
        out.flush()?;
    }
    if !result.stderr.is_empty() {
        err.write_all(result.stderr.as_bytes())?;
        err.flush()?;
    }
    Ok(())
}

/// [`report`] for a failed run; reports whatever partial output it carries.
pub fn report_failure<O, E>(error: &ExecError, out: &mut O, err: &mut E) -> io::Result<()>
where
    O: Write + ?Sized,
    E: Write + ?Sized,
{
    match error.result() {
        Some(result) => report(result, out, err),
        None => {
            warn!(error = %error, "run produced no output to report");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn report_writes_each_stream_to_its_writer() {
        let result = ExecutionResult {
            stdout: "out\n".into(),
            stderr: "err\n".into(),
            exit_code: 0,
            duration: Duration::ZERO,
        };
        let mut out = Vec::new();
        let mut err = Vec::new();
        report(&result, &mut out, &mut err).unwrap();
        assert_eq!(out, b"out\n");
        assert_eq!(err, b"err\n");
    }

    #[test]
    fn failure_report_shows_partial_output() {
        let error = ExecError::ScriptFailed {
            name: "x".into(),
            status: 3,
            result: ExecutionResult {
                stdout: "hello\n".into(),
                exit_code: 3,
                ..ExecutionResult::default()
            },
        };
        let mut out = Vec::new();
        let mut err = Vec::new();
        report_failure(&error, &mut out, &mut err).unwrap();
        assert_eq!(out, b"hello\n");
        assert!(err.is_empty());
    }

    #[test]
    fn embedded_request_takes_its_name_from_the_target() {
        let request = Request::embedded(ExecutionSpec::new("hello.sh").arg("world"));
        match request {
            Request::Embedded { name, options } => {
                assert_eq!(name, "hello.sh");
                assert_eq!(options.args, vec!["world".to_string()]);
            }
            other => panic!("expected embedded request, got {other:?}"),
        }
    }
}
