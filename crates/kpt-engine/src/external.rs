//! The external runtime: invokes a function via the `ResourceList` pipe
//! protocol over stdin/stdout (spec.md §4.2, §6). Per §1's scope, this only
//! models the wire contract and process plumbing — image pulling and
//! container sandboxing are out of scope, so `image` is resolved directly
//! as an executable.

use std::io::Write;
use std::process::{Command, Stdio};

use kpt_core::Resource;
use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};
use crate::runtime::{Runner, RunnerOutput, Runtime};
use crate::wire::ResourceListWire;

#[derive(Debug, Default)]
pub struct ExternalRuntime;

impl Runtime for ExternalRuntime {
    fn get_runner(&self, image: &str) -> Result<Box<dyn Runner>> {
        Ok(Box::new(ExternalRunner {
            image: image.to_string(),
        }))
    }
}

struct ExternalRunner {
    image: String,
}

impl Runner for ExternalRunner {
    fn run(&self, items: Vec<Resource>, function_config: Option<&Resource>) -> Result<RunnerOutput> {
        tracing::debug!(image = %self.image, count = items.len(), "invoking external function");

        let items_json: Vec<JsonValue> = items.iter().map(|r| r.content.clone()).collect();
        let function_config_json = function_config.map(|r| r.content.clone());
        let request = ResourceListWire::request(items_json, function_config_json);
        let payload = serde_json::to_vec(&request)?;

        let spawn_err = |source| EngineError::ExternalSpawn {
            image: self.image.clone(),
            source,
        };

        let mut child = Command::new(&self.image)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Write stdin from a separate thread rather than blocking here: a
        // payload larger than the OS pipe buffer would otherwise deadlock
        // against a function that starts writing stdout before it has
        // finished reading stdin.
        let mut stdin = child.stdin.take().expect("spawned with piped stdin");
        let writer = std::thread::spawn(move || stdin.write_all(&payload));

        let output = child.wait_with_output().map_err(spawn_err)?;
        writer.join().expect("stdin writer thread panicked").map_err(spawn_err)?;

        if !output.status.success() {
            return Err(EngineError::ExternalExitNonZero {
                image: self.image.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let response: ResourceListWire = serde_json::from_slice(&output.stdout)?;
        let items = response.items.into_iter().map(Resource::from_value).collect();
        let results = response.results.unwrap_or_default();
        Ok(RunnerOutput { items, results })
    }
}
