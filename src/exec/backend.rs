// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The dispatcher talks to an `ExecutorBackend` instead of holding a process
//! executor and script runner directly. That keeps the production wiring in
//! one place and lets tests swap in a backend that records requests without
//! spawning anything.

use std::future::Future;
use std::io::Read;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use super::error::ExecError;
use super::process::ProcessExecutor;
use super::script::{ScriptOptions, ScriptRunner};
use super::spec::{ExecutionResult, ExecutionSpec};
use crate::bufpool::BufferPool;

pub type ExecFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ExecutionResult, ExecError>> + Send + 'a>>;

/// Trait abstracting how execution requests are carried out.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ExecutorBackend: Send + Sync {
    /// Run an external executable.
    fn run_process<'a>(
        &'a self,
        spec: ExecutionSpec,
        cancel: &'a CancellationToken,
    ) -> ExecFuture<'a>;

    /// Run script text read from `source`.
    fn run_script<'a>(
        &'a self,
        name: &'a str,
        source: Box<dyn Read + Send>,
        options: ScriptOptions,
        cancel: &'a CancellationToken,
    ) -> ExecFuture<'a>;
}

/// Real executor backend used in production.
#[derive(Debug, Clone, Default)]
pub struct RealExecutorBackend {
    process: ProcessExecutor,
    scripts: ScriptRunner,
}

impl RealExecutorBackend {
    pub fn new(process: ProcessExecutor, scripts: ScriptRunner) -> Self {
        Self { process, scripts }
    }

    /// Both executors sharing one buffer pool.
    pub fn with_buffer_pool(pool: BufferPool) -> Self {
        Self {
            process: ProcessExecutor::with_buffer_pool(pool.clone()),
            scripts: ScriptRunner::default().with_buffer_pool(pool),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn run_process<'a>(
        &'a self,
        spec: ExecutionSpec,
        cancel: &'a CancellationToken,
    ) -> ExecFuture<'a> {
        Box::pin(self.process.run(spec, cancel))
    }

    fn run_script<'a>(
        &'a self,
        name: &'a str,
        source: Box<dyn Read + Send>,
        options: ScriptOptions,
        cancel: &'a CancellationToken,
    ) -> ExecFuture<'a> {
        Box::pin(self.scripts.run(name, source, options, cancel))
    }
}
