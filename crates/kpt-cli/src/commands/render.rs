//! `kpt render`: hydrate a package tree and either print the flattened
//! resource stream or write it back in place.

use std::path::Path;

use kpt_engine::{BuiltinRuntime, ExternalRuntime};
use kpt_hydrate::Hydrator;

use crate::error::Result;

pub fn run(path: &Path, allow_exec: bool, write: bool) -> Result<()> {
    let builtin = BuiltinRuntime;
    let external = ExternalRuntime;
    let hydrator = Hydrator::new(path, &builtin, &external)
        .allow_exec(allow_exec)
        .attribution("kpt render");

    let outcome = hydrator.hydrate()?;

    if write {
        hydrator.write_in_place(&outcome)?;
        eprintln!("wrote {} resources to {}", outcome.resources.len(), path.display());
        return Ok(());
    }

    for (index, resource) in outcome.resources.iter().enumerate() {
        if index > 0 {
            println!("---");
        }
        match serde_yaml::to_string(&resource.content) {
            Ok(doc) => print!("{doc}"),
            Err(err) => eprintln!("failed to render resource: {err}"),
        }
    }

    for result in &outcome.results {
        if result.severity.is_error() {
            eprintln!("error: {}", result.message);
        }
    }

    Ok(())
}
