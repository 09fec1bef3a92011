//! `Runner`/`Runtime` traits at the heart of C2 (spec.md §4.2).
//!
//! Grounded on `sherpack-engine::engine::{Engine, EngineBuilder}`'s pattern
//! of a builder-configured engine exposing a single narrow entry point —
//! here specialized to "produce a `Runner` for an image name" rather than
//! "render a template".

use kpt_core::Resource;

use crate::error::Result;
use crate::result::FunctionResult;

/// The output of one function invocation.
pub struct RunnerOutput {
    pub items: Vec<Resource>,
    pub results: Vec<FunctionResult>,
}

/// Executes exactly one function against a resource stream and its
/// optional function-config resource.
pub trait Runner {
    fn run(&self, items: Vec<Resource>, function_config: Option<&Resource>) -> Result<RunnerOutput>;
}

/// A registry that returns a [`Runner`] for a given image name.
pub trait Runtime: Send + Sync {
    fn get_runner(&self, image: &str) -> Result<Box<dyn Runner>>;
}
