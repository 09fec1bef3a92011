//! kpt-engine — the function runner (C2): built-in and external
//! (`ResourceList`-pipe) runtimes, selector-based tagging/merging around a
//! single function call, and structured per-call diagnostics.

pub mod builtins;
pub mod error;
pub mod external;
pub mod registry;
pub mod result;
pub mod runtime;
pub mod selection;
pub mod wire;

pub use error::EngineError;
pub use external::ExternalRuntime;
pub use registry::BuiltinRuntime;
pub use result::{FunctionResult, Severity};
pub use runtime::{Runner, RunnerOutput, Runtime};
pub use selection::{merge_back, tag_and_select};
pub use wire::ResourceListWire;
