//! Function runner error types (C2, spec.md §4.2).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown function image: {image}")]
    UnknownImage { image: String },

    #[error("function {image} reported an error: {message}")]
    RunnerFailed { image: String, message: String },

    #[error("failed to spawn external function {image}: {source}")]
    ExternalSpawn {
        image: String,
        #[source]
        source: std::io::Error,
    },

    #[error("external function {image} exited with status {status}: {stderr}")]
    ExternalExitNonZero {
        image: String,
        status: i32,
        stderr: String,
    },

    #[error("failed to encode/decode ResourceList: {0}")]
    Wire(#[from] serde_json::Error),

    #[error(transparent)]
    Script(#[from] kpt_script::ScriptError),

    #[error(transparent)]
    Core(#[from] kpt_core::CoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
