use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures that abort a whole analysis run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Input does not look like text: {offending} suspicious characters in the first {sampled}")]
    BinaryInput { offending: usize, sampled: usize },
    #[error("Analysis cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Internal failure of a single detection rule. Never reaches the caller
/// directly; it is folded into a [`Diagnostic`] on the report.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Rule produced invalid details: {0}")]
    InvalidDetails(String),
    #[error("Rule failed: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for RuleError {
    fn from(err: serde_json::Error) -> Self {
        RuleError::InvalidDetails(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule: String,
    pub message: String,
}

impl Diagnostic {
    pub fn from_rule_error(rule: &str, err: &RuleError) -> Self {
        Self {
            rule: rule.to_string(),
            message: err.to_string(),
        }
    }
}
