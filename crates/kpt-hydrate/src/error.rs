//! Error types for kpt-hydrate.
//!
//! Grounded on the donor's `KubeError` taxonomy style (one variant per
//! error class, short lower-case `#[error]` messages parameterized with
//! the offending path/image) but retargeted to this spec's §7 taxonomy:
//! `MalformedInput`, `GraphViolation`, `FunctionError`, `CapabilityDenied`,
//! `Cancelled`. `BackendError`/`LifecycleViolation` belong to `kpt-repo`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HydrateError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HydrateError {
    #[error("malformed input in {path}: {message}")]
    MalformedInput { path: String, message: String },

    #[error("hydration cycle detected at package '{path}'")]
    CycleDetected { path: String },

    #[error("package '{path}' is in an invalid state for hydration")]
    InvalidState { path: String },

    #[error("resource path '{path}' escapes the render root")]
    PathEscape { path: String },

    #[error("function '{image}' failed while hydrating '{package}': {message}")]
    FunctionError {
        package: String,
        image: String,
        message: String,
    },

    #[error("exec function '{image}' denied: allow-exec capability not granted")]
    CapabilityDenied { image: String },

    #[error("merge aborted reading {source_tree} tree at {path}: {message}")]
    MergeSource {
        source_tree: String,
        path: String,
        message: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Core(#[from] kpt_core::CoreError),

    #[error(transparent)]
    Engine(#[from] kpt_engine::EngineError),
}
