//! Error types for the repository adapter (C6) and orchestration cache (C7).
//!
//! Grounded on `sherpack-repo::error::RepoError`'s template (named
//! struct-variants, `#[from]` conversions) but retargeted from HTTP/OCI
//! transport failures to this spec's taxonomy (spec.md §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("malformed input: {message}")]
    MalformedInput { message: String },

    #[error("revision not found: {key}")]
    RevisionNotFound { key: String },

    #[error("package not found: {path}")]
    PackageNotFound { path: String },

    #[error("already exists: {key}")]
    AlreadyExists { key: String },

    #[error("illegal lifecycle transition {from} -> {to}: {message}")]
    LifecycleViolation {
        from: String,
        to: String,
        message: String,
    },

    #[error("backend error: {message}")]
    BackendError { message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Core(#[from] kpt_core::CoreError),
}

pub type Result<T> = std::result::Result<T, RepoError>;
