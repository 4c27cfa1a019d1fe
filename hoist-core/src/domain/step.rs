//! Pipeline step result types

use serde::{Deserialize, Serialize};

/// Successful step result with free-form metadata (e.g. remote response data)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub metadata: serde_json::Value,
}

impl StepOutput {
    pub fn new(metadata: serde_json::Value) -> Self {
        Self { metadata }
    }
}

/// Failed step result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    pub reason: String,
    pub retryable: bool,
}

impl StepError {
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            retryable: true,
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            retryable: false,
        }
    }
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for StepError {}

/// Recorded outcome of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Success { metadata: serde_json::Value },
    Failure { reason: String, retryable: bool },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success { .. })
    }
}

impl From<Result<StepOutput, StepError>> for StepOutcome {
    fn from(result: Result<StepOutput, StepError>) -> Self {
        match result {
            Ok(output) => StepOutcome::Success {
                metadata: output.metadata,
            },
            Err(err) => StepOutcome::Failure {
                reason: err.reason,
                retryable: err.retryable,
            },
        }
    }
}

/// A step's position, name and outcome within one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub outcome: StepOutcome,
}
