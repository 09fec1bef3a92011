//! Structured diagnostics a runner returns alongside its transformed
//! resources (spec.md §4.2: "an ordered `results` list of diagnostics").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }
}

/// One diagnostic entry. `file`/`index` optionally point back at the
/// resource the diagnostic concerns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResult {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl FunctionResult {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            file: None,
            index: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            file: None,
            index: None,
        }
    }
}

/// Whether any entry in `results` has error severity (pipeline-terminating
/// per spec.md §4.2/§4.4).
pub fn has_error(results: &[FunctionResult]) -> bool {
    results.iter().any(|r| r.severity.is_error())
}
