use std::collections::VecDeque;
use std::io::Read;
use std::sync::{Arc, Mutex};

use homekit::exec::{
    ExecError, ExecFuture, ExecutionResult, ExecutionSpec, ExecutorBackend, ScriptOptions,
};
use tokio_util::sync::CancellationToken;

/// One request seen by [`FakeExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Process {
        target: String,
        args: Vec<String>,
        env: Vec<(String, String)>,
        dry_run: bool,
    },
    Script {
        name: String,
        source: String,
        args: Vec<String>,
        dry_run: bool,
    },
}

/// A fake executor that:
/// - records every request it receives (script text included)
/// - answers with queued results, or a default success when none are queued.
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    recorded: Arc<Mutex<Vec<Recorded>>>,
    responses: Arc<Mutex<VecDeque<Result<ExecutionResult, ExecError>>>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next request.
    pub fn respond_with(&self, outcome: Result<ExecutionResult, ExecError>) {
        self.responses.lock().unwrap().push_back(outcome);
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> Result<ExecutionResult, ExecError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ExecutionResult::default()))
    }
}

impl ExecutorBackend for FakeExecutor {
    fn run_process<'a>(
        &'a self,
        spec: ExecutionSpec,
        _cancel: &'a CancellationToken,
    ) -> ExecFuture<'a> {
        self.recorded.lock().unwrap().push(Recorded::Process {
            target: spec.target,
            args: spec.args,
            env: spec.env,
            dry_run: spec.dry_run,
        });
        let outcome = self.next_outcome();
        Box::pin(async move { outcome })
    }

    fn run_script<'a>(
        &'a self,
        name: &'a str,
        mut source: Box<dyn Read + Send>,
        options: ScriptOptions,
        _cancel: &'a CancellationToken,
    ) -> ExecFuture<'a> {
        let mut text = String::new();
        let read = source.read_to_string(&mut text);

        self.recorded.lock().unwrap().push(Recorded::Script {
            name: name.to_string(),
            source: text,
            args: options.args,
            dry_run: options.dry_run,
        });

        let outcome = match read {
            Ok(_) => self.next_outcome(),
            Err(e) => Err(ExecError::ScriptParse {
                name: name.to_string(),
                message: format!("read script: {e}"),
            }),
        };
        Box::pin(async move { outcome })
    }
}
