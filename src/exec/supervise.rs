// src/exec/supervise.rs

//! Spawn a child, wire its streams, and wait for it under a deadline and a
//! cancellation token.
//!
//! This is the run model shared by [`super::process`] and [`super::script`].
//! Both executors build a `tokio::process::Command` and hand it here; they
//! differ only in how they interpret the [`Supervised`] outcome.

use std::io;
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::io::{spawn_feeder, spawn_pump, Drained, Pump, StdinPlan, StreamKind, Wiring};
use crate::bufpool::BufferPool;

/// How long to wait for output pumps once the child is gone. Only matters
/// when a descendant that outlived the child still holds a pipe open.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// How the wait ended.
#[derive(Debug)]
pub(crate) enum RunOutcome {
    Exited(ExitStatus),
    TimedOut,
    Canceled,
    /// Waiting on the child failed.
    Faulted(io::Error),
}

#[derive(Debug)]
pub(crate) struct Supervised {
    pub outcome: RunOutcome,
    pub stdout: Drained,
    pub stderr: Drained,
    pub duration: Duration,
}

pub(crate) struct Launch {
    pub command: Command,
    pub stdin: StdinPlan,
    pub stdout: Wiring,
    pub stderr: Wiring,
    pub timeout: Option<Duration>,
    pub pool: Option<BufferPool>,
}

/// Run the launch to completion. `Err` means the child never started.
pub(crate) async fn supervise(
    launch: Launch,
    label: &str,
    cancel: &CancellationToken,
) -> io::Result<Supervised> {
    let Launch {
        mut command,
        stdin,
        stdout,
        stderr,
        timeout,
        pool,
    } = launch;

    command
        .stdin(stdin.stdio())
        .stdout(stdout.stdio())
        .stderr(stderr.stdio())
        .kill_on_drop(true);

    // Own process group, so a kill reaches everything the child started.
    #[cfg(unix)]
    command.process_group(0);

    let start = Instant::now();
    let mut child = command.spawn()?;
    debug!(label, pid = ?child.id(), ?timeout, "child started");

    let feeder = match (stdin, child.stdin.take()) {
        (StdinPlan::Feed(source), Some(pipe)) => Some(spawn_feeder(source, pipe)),
        _ => None,
    };
    let stdout_pump = child
        .stdout
        .take()
        .and_then(|pipe| spawn_pump(pipe, stdout, StreamKind::Stdout, pool.as_ref()));
    let stderr_pump = child
        .stderr
        .take()
        .and_then(|pipe| spawn_pump(pipe, stderr, StreamKind::Stderr, pool.as_ref()));

    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    // A completed child beats a signal that fires in the same poll; between
    // the two signals, whichever is observed first decides the outcome.
    let outcome = tokio::select! {
        biased;

        status = child.wait() => match status {
            Ok(status) => RunOutcome::Exited(status),
            Err(e) => RunOutcome::Faulted(e),
        },
        _ = cancel.cancelled() => RunOutcome::Canceled,
        _ = deadline => RunOutcome::TimedOut,
    };

    if !matches!(outcome, RunOutcome::Exited(_)) {
        terminate(&mut child, label).await;
    }

    if let Some(feeder) = feeder {
        feeder.abort();
    }
    let (stdout, stderr) = tokio::join!(
        drain(stdout_pump, StreamKind::Stdout),
        drain(stderr_pump, StreamKind::Stderr),
    );
    let duration = start.elapsed();

    debug!(label, ?outcome, ?duration, "child finished");

    Ok(Supervised {
        outcome,
        stdout,
        stderr,
        duration,
    })
}

/// Kill the child and its process group, then reap it.
async fn terminate(child: &mut Child, label: &str) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: killpg only sends a signal; the group id is the pid of a
            // child we spawned as a group leader and have not reaped yet.
            let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
            if rc != 0 {
                debug!(label, pid, error = %io::Error::last_os_error(), "killpg failed");
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(label, error = %e, "failed to kill child process");
    }
}

/// Collect a pump's output. A pipe still held open after `DRAIN_GRACE` is
/// given up on, keeping whatever was read before that.
async fn drain(pump: Option<Pump>, kind: StreamKind) -> Drained {
    let Some(Pump { mut task, stop }) = pump else {
        return Drained::default();
    };

    let joined = match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            warn!(?kind, "output pipe still open after child exit; keeping output read so far");
            stop.cancel();
            task.await
        }
    };

    joined.unwrap_or_else(|join_err| Drained {
        error: Some(io::Error::other(join_err)),
        ..Drained::default()
    })
}
