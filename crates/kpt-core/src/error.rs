//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("package not found: {path}")]
    PackageNotFound { path: String },

    #[error("invalid manifest in {path}: {message}")]
    InvalidManifest { path: String, message: String },

    #[error("malformed YAML in {path}: {source}")]
    MalformedYaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file access error for {path}: {message}")]
    FileAccess { path: String, message: String },

    #[error("resource {kind}/{name} in {path} has no identity: {message}")]
    MissingIdentity {
        kind: String,
        name: String,
        path: String,
        message: String,
    },

    #[error("resource path '{path}' escapes the package root")]
    PathEscape { path: String },

    #[error("duplicate resource at path '{path}' index {index}")]
    DuplicateResource { path: String, index: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
