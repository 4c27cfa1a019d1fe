//! Error types for the deployment client

use std::fmt;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// A remote mutation issued by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Phase 1: set the service's image reference
    UpdateImage,
    /// Phase 2: restart the service instance on the configured image
    TriggerRedeploy,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::UpdateImage => write!(f, "update_image"),
            Operation::TriggerRedeploy => write!(f, "trigger_redeploy"),
        }
    }
}

/// Failure to get any response from the remote API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Errors that can occur when calling the remote control plane
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response from the remote API (network failure or timeout)
    #[error("{operation} transport failure: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    /// Remote API answered with an explicit error list
    #[error("{operation} rejected by remote API: {}", .messages.first().map(String::as_str).unwrap_or("unknown error"))]
    Rejected {
        operation: Operation,
        messages: Vec<String>,
        /// Whether a message matched a known-transient pattern
        transient: bool,
    },

    /// Remote API returned a non-success status without a GraphQL error list
    #[error("{operation} failed (status {status}): {body}")]
    HttpStatus {
        operation: Operation,
        status: u16,
        body: String,
    },

    /// Response body was not the expected JSON envelope
    #[error("{operation} returned an unparseable response: {message}")]
    ParseError {
        operation: Operation,
        message: String,
    },

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ClientError {
    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { .. } => true,
            ClientError::Rejected { transient, .. } => *transient,
            ClientError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            ClientError::ParseError { .. } | ClientError::HttpClient(_) => false,
        }
    }

    /// The operation that failed, if the error came from a remote call
    pub fn operation(&self) -> Option<Operation> {
        match self {
            ClientError::Transport { operation, .. }
            | ClientError::Rejected { operation, .. }
            | ClientError::HttpStatus { operation, .. }
            | ClientError::ParseError { operation, .. } => Some(*operation),
            ClientError::HttpClient(_) => None,
        }
    }
}

/// Failure of a two-phase deployment
///
/// `phase` is the mutation that failed. A failure in
/// [`Operation::TriggerRedeploy`] means the image reference was already
/// updated and only the restart is missing.
#[derive(Debug, Error)]
#[error("deployment failed during {phase}: {source}")]
pub struct DeployError {
    pub phase: Operation,
    #[source]
    pub source: ClientError,
}

impl DeployError {
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }

    /// True when phase 1 succeeded and phase 2 failed
    pub fn is_partial(&self) -> bool {
        self.phase == Operation::TriggerRedeploy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_always_retryable() {
        let err = ClientError::Transport {
            operation: Operation::UpdateImage,
            source: TransportError::Timeout("30s".to_string()),
        };
        assert!(err.is_retryable());
        assert_eq!(err.operation(), Some(Operation::UpdateImage));
    }

    #[test]
    fn test_rejection_retryable_only_when_transient() {
        let rejected = |transient| ClientError::Rejected {
            operation: Operation::TriggerRedeploy,
            messages: vec!["Service not found".to_string()],
            transient,
        };
        assert!(!rejected(false).is_retryable());
        assert!(rejected(true).is_retryable());
        assert!(rejected(false).to_string().contains("Service not found"));
    }

    #[test]
    fn test_http_status_classification() {
        let status = |status| ClientError::HttpStatus {
            operation: Operation::UpdateImage,
            status,
            body: String::new(),
        };
        assert!(status(502).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(401).is_retryable());
    }

    #[test]
    fn test_deploy_error_partial() {
        let err = DeployError {
            phase: Operation::TriggerRedeploy,
            source: ClientError::Transport {
                operation: Operation::TriggerRedeploy,
                source: TransportError::Connect("refused".to_string()),
            },
        };
        assert!(err.is_partial());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("trigger_redeploy"));
    }
}
