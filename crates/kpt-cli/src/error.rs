//! CLI error type with exit code handling, grounded on the donor's
//! `CliError`/`exit_code()` pattern but retargeted to spec.md §6's three
//! outcome classes instead of the donor's five-variant split.

use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("{message}")]
    #[diagnostic(code(kpt::cli::validation))]
    Validation { message: String },

    #[error("{message}")]
    #[diagnostic(code(kpt::cli::backend))]
    Backend { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Backend { .. } => exit_codes::BACKEND_ERROR,
        }
    }
}

/// Whether a `CoreError` represents bad input/state (validation) rather than
/// a storage or transport failure (backend). `Io` is the only variant that
/// isn't ultimately about the content of something on disk.
fn core_error_is_validation(err: &kpt_core::CoreError) -> bool {
    use kpt_core::CoreError::*;
    !matches!(err, Io(_) | FileAccess { .. })
}

fn script_error_is_validation(_err: &kpt_script::ScriptError) -> bool {
    true
}

fn engine_error_is_validation(err: &kpt_engine::EngineError) -> bool {
    use kpt_engine::EngineError::*;
    match err {
        UnknownImage { .. } | RunnerFailed { .. } | ExternalExitNonZero { .. } => true,
        ExternalSpawn { .. } | Wire(_) => false,
        Script(source) => script_error_is_validation(source),
        Core(source) => core_error_is_validation(source),
    }
}

impl From<kpt_hydrate::HydrateError> for CliError {
    fn from(err: kpt_hydrate::HydrateError) -> Self {
        use kpt_hydrate::HydrateError::*;
        let message = err.to_string();
        let is_validation = match &err {
            Cancelled => false,
            Core(source) => core_error_is_validation(source),
            Engine(source) => engine_error_is_validation(source),
            MalformedInput { .. }
            | CycleDetected { .. }
            | InvalidState { .. }
            | PathEscape { .. }
            | FunctionError { .. }
            | CapabilityDenied { .. }
            | MergeSource { .. } => true,
        };
        if is_validation {
            CliError::Validation { message }
        } else {
            CliError::Backend { message }
        }
    }
}

impl From<kpt_repo::RepoError> for CliError {
    fn from(err: kpt_repo::RepoError) -> Self {
        use kpt_repo::RepoError::*;
        let message = err.to_string();
        let is_validation = match &err {
            BackendError { .. } | Cancelled => false,
            Core(source) => core_error_is_validation(source),
            MalformedInput { .. }
            | RevisionNotFound { .. }
            | PackageNotFound { .. }
            | AlreadyExists { .. }
            | LifecycleViolation { .. } => true,
        };
        if is_validation {
            CliError::Validation { message }
        } else {
            CliError::Backend { message }
        }
    }
}

impl From<kpt_core::CoreError> for CliError {
    fn from(err: kpt_core::CoreError) -> Self {
        let message = err.to_string();
        if core_error_is_validation(&err) {
            CliError::Validation { message }
        } else {
            CliError::Backend { message }
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
