use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("parse error: {0}")]
    Parse(Box<pest::error::Error<crate::parser::Rule>>),

    #[error("invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("unexpected token: {0}")]
    Unexpected(String),

    #[error("cannot compare values of different types at {path}")]
    TypeMismatch { path: String },
}

impl From<pest::error::Error<crate::parser::Rule>> for ScriptError {
    fn from(e: pest::error::Error<crate::parser::Rule>) -> Self {
        ScriptError::Parse(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
