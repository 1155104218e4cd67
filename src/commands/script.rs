// src/commands/script.rs

use std::io::Write;

use tracing::{error, info};

use crate::cli::RunArgs;
use crate::dispatch::{report, report_failure, Dispatcher, Request};
use crate::errors::{HomekitError, Result};
use crate::exec::env::parse_pairs;
use crate::exec::{ExecutionSpec, InputSource, EXIT_SUCCESS};
use crate::runtime::Runtime;
use crate::types::AssetNamespace;

/// `homekit script run`. Output is captured and written to `out`/`err` once
/// the run ends, including on failure.
pub async fn run<O, E>(runtime: &Runtime, args: RunArgs, out: &mut O, err: &mut E) -> Result<i32>
where
    O: Write + ?Sized,
    E: Write + ?Sized,
{
    let mut spec = ExecutionSpec::new(args.target)
        .args(args.args)
        .capture_output(true)
        .dry_run(runtime.dry_run())
        .stdin(InputSource::Inherit);
    spec.env = parse_pairs(&args.env);
    spec.timeout = Some(args.timeout);
    spec.working_dir = args.workdir;

    let request = if args.embedded {
        Request::embedded(spec)
    } else {
        Request::Process(spec)
    };

    let backend = runtime.backend();
    let dispatcher = Dispatcher::new(runtime.assets(), &backend);
    let cancel = runtime.child_token();

    match dispatcher.dispatch(request, &cancel).await {
        Ok(result) => {
            report(&result, out, err)?;
            info!(exit_code = result.exit_code, elapsed = ?result.duration, "run finished");
            Ok(EXIT_SUCCESS)
        }
        Err(HomekitError::Exec(exec_err)) => {
            report_failure(&exec_err, out, err)?;
            error!(error = %exec_err, "run failed");
            Ok(exec_err.exit_code())
        }
        Err(other) => Err(other),
    }
}

/// `homekit script list`.
pub fn list<O>(runtime: &Runtime, out: &mut O) -> Result<i32>
where
    O: Write + ?Sized,
{
    for name in runtime.assets().list(AssetNamespace::Scripts) {
        writeln!(out, "{name}")?;
    }
    Ok(EXIT_SUCCESS)
}
