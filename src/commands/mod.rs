// src/commands/mod.rs

//! Subcommand handlers. Each one takes the runtime and the writers it reports
//! to, and returns the exit code the binary should use.

pub mod assets;
pub mod script;

use std::io::Write;

use crate::cli::{AssetsCommand, Command, ScriptCommand};
use crate::errors::Result;
use crate::runtime::Runtime;

pub async fn execute<O, E>(
    runtime: &Runtime,
    command: Command,
    out: &mut O,
    err: &mut E,
) -> Result<i32>
where
    O: Write + ?Sized,
    E: Write + ?Sized,
{
    match command {
        Command::Script(ScriptCommand::Run(args)) => script::run(runtime, args, out, err).await,
        Command::Script(ScriptCommand::List) => script::list(runtime, out),
        Command::Assets(AssetsCommand::List { namespace }) => assets::list(runtime, namespace, out),
        Command::Assets(AssetsCommand::Extract {
            namespace,
            name,
            dest,
        }) => assets::extract(runtime, namespace, &name, &dest, out),
        Command::Assets(AssetsCommand::Verify { namespace, name }) => {
            assets::verify(runtime, namespace, &name, out)
        }
        Command::Version => {
            writeln!(out, "{}", runtime.version())?;
            Ok(0)
        }
    }
}
