//! Transport layer
//!
//! The seam between the deployment client and the network. The client builds
//! authenticated GraphQL requests; a [`Transport`] delivers them and hands back
//! the raw status and body.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::TransportError;
use crate::graphql::GraphQlRequest;

/// An authenticated request to the remote API
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub bearer_token: String,
    pub body: GraphQlRequest,
}

/// Raw response from the remote API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Delivers requests to the remote control plane
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and waits for the full response
    ///
    /// Returns `Err` only when no response was received (network failure,
    /// timeout). Any HTTP status, including errors, is an `Ok` response.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport posting JSON to a single endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport whose every request is bounded by `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(endpoint, client))
    }

    /// Creates a transport with a custom HTTP client
    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&request.bearer_token)
            .json(&request.body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_creation() {
        let transport =
            HttpTransport::new("https://backboard.railway.app/graphql/v2", Duration::from_secs(5))
                .unwrap();
        assert_eq!(transport.endpoint(), "https://backboard.railway.app/graphql/v2");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept connections
        let transport =
            HttpTransport::new("http://127.0.0.1:9/graphql", Duration::from_secs(2)).unwrap();
        let result = transport
            .send(TransportRequest {
                bearer_token: "token".to_string(),
                body: GraphQlRequest::new("query { x }", serde_json::json!({})),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_silent_endpoint_times_out_as_retryable() {
        use crate::error::{ClientError, Operation};
        use tokio::net::TcpListener;

        // Accepts connections but never writes a response
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let transport =
            HttpTransport::new(format!("http://{}/graphql", addr), Duration::from_millis(100))
                .unwrap();
        let err = transport
            .send(TransportRequest {
                bearer_token: "token".to_string(),
                body: GraphQlRequest::new("query { x }", serde_json::json!({})),
            })
            .await
            .unwrap_err();
        server.abort();

        assert!(matches!(err, TransportError::Timeout(_)), "got {:?}", err);

        let client_err = ClientError::Transport {
            operation: Operation::UpdateImage,
            source: err,
        };
        assert!(client_err.is_retryable());
    }
}
