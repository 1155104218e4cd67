// src/exec/spec.rs

//! Request and result types shared by the process executor and the script
//! runner.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncRead;

pub const EXIT_SUCCESS: i32 = 0;
/// Internal fault with no child exit status to report.
pub const EXIT_UNKNOWN: i32 = -1;
pub const EXIT_TIMEOUT: i32 = 124;
pub const EXIT_CANCELED: i32 = 125;

/// Where a child's standard input comes from.
pub enum InputSource {
    /// The caller's own standard input.
    Inherit,
    /// An empty stream.
    Null,
    Bytes(Vec<u8>),
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Inherit => f.write_str("Inherit"),
            InputSource::Null => f.write_str("Null"),
            InputSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            InputSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// One execution request. Built per invocation and consumed by the run.
#[derive(Debug, Default)]
pub struct ExecutionSpec {
    /// Executable path, or the name of an embedded script.
    pub target: String,
    pub args: Vec<String>,
    /// Overrides applied on top of the inherited environment, in order.
    /// A later entry wins over an earlier one with the same key.
    pub env: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    /// `None` or zero means no deadline.
    pub timeout: Option<Duration>,
    pub capture_output: bool,
    pub dry_run: bool,
    /// `None` leaves the executor's default in place.
    pub stdin: Option<InputSource>,
}

impl ExecutionSpec {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn stdin(mut self, stdin: InputSource) -> Self {
        self.stdin = Some(stdin);
        self
    }

    /// The deadline to enforce, if any.
    pub fn effective_timeout(&self) -> Option<Duration> {
        effective_timeout(self.timeout)
    }

    /// The working directory to switch to; an empty path means "inherit".
    pub fn effective_dir(&self) -> Option<&Path> {
        effective_dir(self.working_dir.as_deref())
    }
}

pub(crate) fn effective_timeout(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| !t.is_zero())
}

pub(crate) fn effective_dir(dir: Option<&Path>) -> Option<&Path> {
    dir.filter(|d| !d.as_os_str().is_empty())
}

/// Uniform outcome of a process or script run.
///
/// `stdout`/`stderr` are only filled when output was captured; otherwise it
/// already went to the live destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == EXIT_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_and_empty_dir_mean_unset() {
        let spec = ExecutionSpec::new("true")
            .timeout(Duration::ZERO)
            .working_dir("");
        assert_eq!(spec.effective_timeout(), None);
        assert_eq!(spec.effective_dir(), None);

        let spec = ExecutionSpec::new("true")
            .timeout(Duration::from_millis(50))
            .working_dir("/tmp");
        assert_eq!(spec.effective_timeout(), Some(Duration::from_millis(50)));
        assert_eq!(spec.effective_dir(), Some(Path::new("/tmp")));
    }

    #[test]
    fn builder_keeps_env_order() {
        let spec = ExecutionSpec::new("env")
            .env("A", "1")
            .env("B", "2")
            .env("A", "3");
        assert_eq!(
            spec.env,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "3".to_string()),
            ]
        );
    }
}
