// src/commands/assets.rs

use std::io::Write;
use std::path::Path;

use crate::errors::Result;
use crate::exec::EXIT_SUCCESS;
use crate::runtime::Runtime;
use crate::types::AssetNamespace;

pub fn list<O>(runtime: &Runtime, namespace: AssetNamespace, out: &mut O) -> Result<i32>
where
    O: Write + ?Sized,
{
    for name in runtime.assets().list(namespace) {
        writeln!(out, "{name}")?;
    }
    Ok(EXIT_SUCCESS)
}

/// Prints the written path. Under `--dry-run` only the target path is printed.
pub fn extract<O>(
    runtime: &Runtime,
    namespace: AssetNamespace,
    name: &str,
    dest: &Path,
    out: &mut O,
) -> Result<i32>
where
    O: Write + ?Sized,
{
    if runtime.dry_run() {
        runtime.assets().source_of(namespace, name)?;
        writeln!(out, "would write {}", dest.join(name).display())?;
        return Ok(EXIT_SUCCESS);
    }

    let path = runtime.assets().export(namespace, name, dest)?;
    writeln!(out, "{}", path.display())?;
    Ok(EXIT_SUCCESS)
}

/// Prints `<sha256>  <namespace>/<name>`, like `sha256sum`.
pub fn verify<O>(runtime: &Runtime, namespace: AssetNamespace, name: &str, out: &mut O) -> Result<i32>
where
    O: Write + ?Sized,
{
    let digest = runtime.assets().verify(namespace, name)?;
    writeln!(out, "{digest}  {namespace}/{name}")?;
    Ok(EXIT_SUCCESS)
}
