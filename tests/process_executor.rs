// tests/process_executor.rs
#![cfg(unix)]

use std::error::Error;
use std::time::{Duration, Instant};

use homekit::exec::{
    ExecError, ExecutionSpec, InputSource, ProcessExecutor, EXIT_CANCELED, EXIT_TIMEOUT,
};
use homekit_test_utils::builders::sh;
use homekit_test_utils::{init_tracing, with_timeout};
use tokio_util::sync::CancellationToken;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn env_override_is_visible_and_absent_without_it() -> TestResult {
    init_tracing();
    let exec = ProcessExecutor::new();
    let cancel = CancellationToken::new();

    let res = exec
        .run(
            sh("printf '%s' \"${HOMEKIT_TEST_FOO-unset}\"").env("HOMEKIT_TEST_FOO", "bar"),
            &cancel,
        )
        .await?;
    assert_eq!(res.stdout, "bar");

    let res = exec
        .run(sh("printf '%s' \"${HOMEKIT_TEST_FOO-unset}\""), &cancel)
        .await?;
    assert_eq!(res.stdout, "unset");
    Ok(())
}

#[tokio::test]
async fn later_env_entry_wins() -> TestResult {
    let res = ProcessExecutor::new()
        .run(
            sh("printf '%s' \"$HOMEKIT_TEST_DUP\"")
                .env("HOMEKIT_TEST_DUP", "first")
                .env("HOMEKIT_TEST_DUP", "second"),
            &CancellationToken::new(),
        )
        .await?;
    assert_eq!(res.stdout, "second");
    Ok(())
}

#[tokio::test]
async fn runs_in_the_requested_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    let res = ProcessExecutor::new()
        .run(sh("pwd -P").working_dir(dir.path()), &CancellationToken::new())
        .await?;
    let expected = dir.path().canonicalize()?;
    assert_eq!(res.stdout.trim_end(), expected.to_string_lossy());
    Ok(())
}

#[tokio::test]
async fn stdin_bytes_reach_the_child() -> TestResult {
    let res = ProcessExecutor::new()
        .run(
            ExecutionSpec::new("cat")
                .capture_output(true)
                .stdin(InputSource::Bytes(b"piped input\n".to_vec())),
            &CancellationToken::new(),
        )
        .await?;
    assert_eq!(res.stdout, "piped input\n");
    assert!(res.success());
    Ok(())
}

#[tokio::test]
async fn default_stdin_is_empty() -> TestResult {
    let res = with_timeout(
        ProcessExecutor::new().run(ExecutionSpec::new("cat").capture_output(true), &CancellationToken::new()),
    )
    .await?;
    assert_eq!(res.stdout, "");
    Ok(())
}

#[tokio::test]
async fn missing_binary_is_a_spawn_error() {
    let err = ProcessExecutor::new()
        .run(
            ExecutionSpec::new("/nonexistent/homekit-test-binary").capture_output(true),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Spawn { .. }), "got {err:?}");
    assert!(err.is_tooling_fault());
    assert!(err.result().is_none());
}

#[tokio::test]
async fn deadline_kills_the_child_and_reports_124() {
    init_tracing();
    let started = Instant::now();
    let err = with_timeout(ProcessExecutor::new().run(
        sh("echo started; sleep 10").timeout(Duration::from_millis(200)),
        &CancellationToken::new(),
    ))
    .await
    .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        ExecError::Timeout { timeout, result, .. } => {
            assert_eq!(timeout, Duration::from_millis(200));
            assert_eq!(result.exit_code, EXIT_TIMEOUT);
            assert_eq!(result.stdout, "started\n");
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn deadline_also_stops_background_children() -> TestResult {
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("leaked");
    let script = format!("(sleep 1; touch '{}') & wait", marker.display());

    let err = with_timeout(ProcessExecutor::new().run(
        sh(&script).timeout(Duration::from_millis(200)),
        &CancellationToken::new(),
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, ExecError::Timeout { .. }), "got {err:?}");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists(), "background child outlived the deadline");
    Ok(())
}

#[tokio::test]
async fn killed_by_signal_reports_128_plus_signal() {
    let err = ProcessExecutor::new()
        .run(sh("kill -9 $$"), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ExecError::CommandFailed { status, result, .. } => {
            assert_eq!(status, 128 + 9);
            assert_eq!(result.exit_code, 137);
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_kills_the_child_and_reports_125() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let err = with_timeout(ProcessExecutor::new().run(sh("sleep 10"), &cancel))
        .await
        .unwrap_err();

    assert!(err.is_aborted());
    match err {
        ExecError::Canceled { result, .. } => assert_eq!(result.exit_code, EXIT_CANCELED),
        other => panic!("expected Canceled, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_runs_keep_their_own_output() -> TestResult {
    let exec = ProcessExecutor::new();
    let cancel = CancellationToken::new();

    let runs = (0..8).map(|i| {
        let exec = exec.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            exec.run(
                sh("for n in 1 2 3; do echo \"$ID\"; done").env("ID", i.to_string()),
                &cancel,
            )
            .await
        })
    });

    for (i, handle) in runs.collect::<Vec<_>>().into_iter().enumerate() {
        let res = handle.await??;
        assert_eq!(res.stdout, format!("{i}\n{i}\n{i}\n"));
    }
    Ok(())
}

#[tokio::test]
async fn background_child_holding_stdout_keeps_captured_output() -> TestResult {
    init_tracing();
    let started = Instant::now();
    let res = with_timeout(
        ProcessExecutor::new().run(sh("sleep 5 & echo hi"), &CancellationToken::new()),
    )
    .await?;

    assert_eq!(res.exit_code, 0);
    assert_eq!(res.stdout, "hi\n");
    assert!(started.elapsed() < Duration::from_millis(4500));
    Ok(())
}
