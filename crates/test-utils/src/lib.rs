//! Shared helpers for homekit's integration tests: tracing setup, a hang
//! guard for async tests, request builders and a recording executor backend.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use homekit::logging::LOG_ENV_VAR;
use tracing_subscriber::{EnvFilter, fmt};

/// Longest any single async test may run before it is failed as hung.
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test-scoped tracing subscriber once per test binary.
///
/// Filtering follows the binary: `HOMEKIT_LOG=debug cargo test` shows the
/// executor's spawn/kill/drain events. Without it only homekit's own `info`
/// events are kept. Output goes through the test writer, so it shows up only
/// for failing tests unless `--nocapture` is given.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("warn,homekit=info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_DEADLINE`].
///
/// Executor tests wrap runs in this so a child that escaped its kill shows
/// up as a failure instead of a stuck test binary.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_DEADLINE, f).await {
        Ok(value) => value,
        Err(_) => panic!("test still running after {TEST_DEADLINE:?}"),
    }
}
