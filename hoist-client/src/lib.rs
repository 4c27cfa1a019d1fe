//! Hoist Deployment Client
//!
//! A thin adapter over the remote control plane's GraphQL API. A deployment
//! is two sequential mutations:
//!
//! 1. **UpdateImage**: point the service at a new image reference
//! 2. **TriggerRedeploy**: restart the service instance so it picks the image up
//!
//! Phase 2 is never attempted when phase 1 fails.
//!
//! # Example
//!
//! ```no_run
//! use hoist_client::{ClientConfig, DeploymentClient};
//! use hoist_core::domain::target::DeploymentTarget;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DeploymentClient::new(ClientConfig::new("railway-token"))?;
//!
//! let target = DeploymentTarget::new("svc-1", "env-1", "ghcr.io/org/payment:v2");
//! let outcome = client.deploy(&target).await?;
//! println!("redeployed {}", outcome.target.service_id);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod graphql;
mod mutations;
pub mod transport;

pub use error::{ClientError, DeployError, Operation, Result, TransportError};
pub use mutations::{DeployOutcome, RedeployMode};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::graphql::{GraphQlRequest, GraphQlResponse};

/// Default Railway GraphQL endpoint
pub const DEFAULT_ENDPOINT: &str = "https://backboard.railway.app/graphql/v2";

/// Default rejection messages treated as transient (matched case-insensitively)
pub const DEFAULT_TRANSIENT_PATTERNS: &[&str] = &[
    "rate limit",
    "timeout",
    "timed out",
    "temporarily unavailable",
    "try again",
];

/// Deployment client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GraphQL endpoint URL
    pub endpoint: String,
    /// Bearer credential sent with every request
    pub token: String,
    /// Upper bound for each remote call
    pub timeout: Duration,
    /// Which phase 2 mutation to issue
    pub redeploy_mode: RedeployMode,
    /// Rejection messages that should be treated as retryable
    pub transient_patterns: Vec<String>,
}

impl ClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: token.into(),
            timeout: Duration::from_secs(30),
            redeploy_mode: RedeployMode::default(),
            transient_patterns: DEFAULT_TRANSIENT_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// Client for the remote deployment API
///
/// Holds only immutable configuration and is cheap to clone; share one
/// instance across all pipeline steps.
#[derive(Clone)]
pub struct DeploymentClient {
    token: String,
    redeploy_mode: RedeployMode,
    transient_patterns: Vec<String>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for DeploymentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentClient")
            .field("redeploy_mode", &self.redeploy_mode)
            .field("transient_patterns", &self.transient_patterns)
            .finish_non_exhaustive()
    }
}

impl DeploymentClient {
    /// Creates a client talking HTTP to `config.endpoint`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.endpoint, config.timeout)?;
        Ok(Self {
            token: config.token,
            redeploy_mode: config.redeploy_mode,
            transient_patterns: normalize_patterns(config.transient_patterns),
            transport: Arc::new(transport),
        })
    }

    /// Creates a client over a custom transport
    pub fn with_transport(token: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            token: token.into(),
            redeploy_mode: RedeployMode::default(),
            transient_patterns: normalize_patterns(
                DEFAULT_TRANSIENT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            ),
            transport,
        }
    }

    pub fn with_redeploy_mode(mut self, mode: RedeployMode) -> Self {
        self.redeploy_mode = mode;
        self
    }

    pub fn redeploy_mode(&self) -> RedeployMode {
        self.redeploy_mode
    }

    // =============================================================================
    // Response Handling
    // =============================================================================

    /// Sends one mutation and returns its `data` payload
    async fn execute(&self, operation: Operation, body: GraphQlRequest) -> Result<serde_json::Value> {
        debug!("Sending {} mutation", operation);

        let response = self
            .transport
            .send(TransportRequest {
                bearer_token: self.token.clone(),
                body,
            })
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;

        self.handle_response(operation, response)
    }

    /// Classifies a raw response into data or a typed error
    fn handle_response(
        &self,
        operation: Operation,
        response: TransportResponse,
    ) -> Result<serde_json::Value> {
        let success = (200..300).contains(&response.status);
        let parsed = serde_json::from_str::<GraphQlResponse>(&response.body);

        match parsed {
            Ok(envelope) if !envelope.errors.is_empty() => {
                let messages: Vec<String> =
                    envelope.errors.into_iter().map(|e| e.message).collect();
                let transient = self.is_transient(&messages)
                    || (!success && (response.status >= 500 || response.status == 429));
                Err(ClientError::Rejected {
                    operation,
                    messages,
                    transient,
                })
            }
            Ok(envelope) if success => Ok(envelope.data.unwrap_or(serde_json::Value::Null)),
            Ok(_) => Err(ClientError::HttpStatus {
                operation,
                status: response.status,
                body: response.body,
            }),
            Err(_) if !success => Err(ClientError::HttpStatus {
                operation,
                status: response.status,
                body: response.body,
            }),
            Err(e) => Err(ClientError::ParseError {
                operation,
                message: format!("Failed to parse JSON response: {}", e),
            }),
        }
    }

    fn is_transient(&self, messages: &[String]) -> bool {
        messages.iter().any(|message| {
            let message = message.to_lowercase();
            self.transient_patterns
                .iter()
                .any(|pattern| message.contains(pattern.as_str()))
        })
    }
}

fn normalize_patterns(patterns: Vec<String>) -> Vec<String> {
    patterns
        .into_iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}
