// src/exec/mod.rs

//! Execution core.
//!
//! Runs external processes and embedded scripts under one contract: optional
//! deadline, cooperative cancellation, dry-run, output capture and
//! normalised exit codes.
//!
//! - [`spec`] holds the request/result types and exit-code sentinels.
//! - [`process`] runs executables; [`script`] runs script text through a
//!   [`engine::ScriptEngine`].
//! - [`supervise`] is the shared spawn/wait/kill loop both build on, with
//!   stream wiring in [`io`].
//! - [`backend`] provides the `ExecutorBackend` trait the dispatcher uses,
//!   and which tests can replace with a fake implementation.

pub mod backend;
pub mod engine;
pub mod env;
pub mod error;
pub mod io;
pub mod process;
pub mod script;
pub mod spec;
pub mod status;
mod supervise;

pub use backend::{ExecFuture, ExecutorBackend, RealExecutorBackend};
pub use engine::{PosixShell, Script, ScriptEngine};
pub use error::ExecError;
pub use io::{OutputSink, SharedBuffer};
pub use process::ProcessExecutor;
pub use script::{ScriptOptions, ScriptPhase, ScriptRunner};
pub use spec::{
    ExecutionResult, ExecutionSpec, InputSource, EXIT_CANCELED, EXIT_SUCCESS, EXIT_TIMEOUT,
    EXIT_UNKNOWN,
};
