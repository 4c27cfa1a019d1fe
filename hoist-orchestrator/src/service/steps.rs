//! Deployment steps
//!
//! Pipeline steps backed by the deployment client. Each step resolves its
//! target from the configured defaults plus the event's overrides.

use async_trait::async_trait;
use hoist_client::{ClientError, DeploymentClient};
use hoist_core::domain::event::TriggerEvent;
use hoist_core::domain::step::{StepError, StepOutput};
use hoist_core::domain::target::DeploymentTarget;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::service::registry::Step;

/// Kinds of steps a pipeline can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Phase 1 only
    UpdateImage,
    /// Phase 2 only
    Redeploy,
    /// Both phases as a single step
    Deploy,
}

impl StepKind {
    /// The default pipeline: phase 1 and phase 2 as separate steps, so a
    /// failed redeploy is reported at its own index
    pub fn default_pipeline() -> Vec<StepKind> {
        vec![StepKind::UpdateImage, StepKind::Redeploy]
    }
}

/// Builds a step of `kind` for `target`
pub fn build_step(
    kind: StepKind,
    client: DeploymentClient,
    target: DeploymentTarget,
    retry: RetryPolicy,
) -> Arc<dyn Step> {
    match kind {
        StepKind::UpdateImage => Arc::new(UpdateImageStep::new(client, target).with_retry(retry)),
        StepKind::Redeploy => Arc::new(RedeployStep::new(client, target)),
        StepKind::Deploy => Arc::new(DeployStep::new(client, target)),
    }
}

// =============================================================================
// Retry
// =============================================================================

/// Exponential backoff for retryable client errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Runs `operation` until it succeeds, fails non-retryably, or attempts run out
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 0;
        let mut delay = self.initial_delay;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("{} succeeded after {} attempt(s)", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label, attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.max_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

fn step_error(err: ClientError) -> StepError {
    StepError {
        retryable: err.is_retryable(),
        reason: err.to_string(),
    }
}

// =============================================================================
// Steps
// =============================================================================

/// Phase 1: set the service image
pub struct UpdateImageStep {
    client: DeploymentClient,
    target: DeploymentTarget,
    retry: RetryPolicy,
}

impl UpdateImageStep {
    pub fn new(client: DeploymentClient, target: DeploymentTarget) -> Self {
        Self {
            client,
            target,
            retry: RetryPolicy::none(),
        }
    }

    /// Image updates are idempotent, so retrying them is safe
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Step for UpdateImageStep {
    fn name(&self) -> &str {
        "update_image"
    }

    async fn execute(&self, event: &TriggerEvent) -> Result<StepOutput, StepError> {
        let target = self.target.with_overrides(&event.fields);
        info!("Setting image of {} to {}", target.service_id, target.image);

        let response = self
            .retry
            .run("update_image", || {
                self.client.update_image(&target.service_id, &target.image)
            })
            .await
            .map_err(step_error)?;

        Ok(StepOutput::new(json!({
            "service_id": target.service_id,
            "image": target.image,
            "response": response,
        })))
    }
}

/// Phase 2: restart the service instance
///
/// Attempted exactly once per trigger; a repeated call would restart again.
pub struct RedeployStep {
    client: DeploymentClient,
    target: DeploymentTarget,
}

impl RedeployStep {
    pub fn new(client: DeploymentClient, target: DeploymentTarget) -> Self {
        Self { client, target }
    }
}

#[async_trait]
impl Step for RedeployStep {
    fn name(&self) -> &str {
        "redeploy"
    }

    async fn execute(&self, event: &TriggerEvent) -> Result<StepOutput, StepError> {
        let target = self.target.with_overrides(&event.fields);
        info!(
            "Triggering redeploy of {} in environment {}",
            target.service_id, target.environment_id
        );

        let response = self
            .client
            .trigger_redeploy(&target.service_id, &target.environment_id)
            .await
            .map_err(step_error)?;

        Ok(StepOutput::new(json!({
            "service_id": target.service_id,
            "environment_id": target.environment_id,
            "response": response,
        })))
    }
}

/// Both phases as one step
pub struct DeployStep {
    client: DeploymentClient,
    target: DeploymentTarget,
}

impl DeployStep {
    pub fn new(client: DeploymentClient, target: DeploymentTarget) -> Self {
        Self { client, target }
    }
}

#[async_trait]
impl Step for DeployStep {
    fn name(&self) -> &str {
        "deploy"
    }

    async fn execute(&self, event: &TriggerEvent) -> Result<StepOutput, StepError> {
        let target = self.target.with_overrides(&event.fields);

        let outcome = self.client.deploy(&target).await.map_err(|e| StepError {
            retryable: e.is_retryable(),
            reason: if e.is_partial() {
                format!("{} (image already updated, resume at redeploy)", e)
            } else {
                e.to_string()
            },
        })?;

        Ok(StepOutput::new(json!({
            "service_id": outcome.target.service_id,
            "environment_id": outcome.target.environment_id,
            "image": outcome.target.image,
            "update": outcome.update,
            "redeploy": outcome.redeploy,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoist_client::{Operation, Transport, TransportError, TransportRequest, TransportResponse};
    use hoist_core::domain::event::EventFields;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> TransportRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Request("no scripted response".into())))
        }
    }

    fn ok(body: &str) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn timeout() -> Result<TransportResponse, TransportError> {
        Err(TransportError::Timeout("deadline".into()))
    }

    fn target() -> DeploymentTarget {
        DeploymentTarget::new("svc-1", "env-1", "repo/img:latest")
    }

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn event_with_image(image: &str) -> TriggerEvent {
        TriggerEvent::new(
            "payment-service",
            b"{}".to_vec(),
            EventFields {
                image: Some(image.to_string()),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_update_image_uses_event_image() {
        let transport = ScriptedTransport::new(vec![ok(r#"{"data":{"serviceInstanceUpdate":true}}"#)]);
        let client = DeploymentClient::with_transport("token", transport.clone());
        let step = UpdateImageStep::new(client, target());

        let output = step
            .execute(&event_with_image("ghcr.io/org/payment:v2"))
            .await
            .unwrap();

        assert_eq!(output.metadata["image"], "ghcr.io/org/payment:v2");
        assert_eq!(
            transport.last_request().body.variables["image"],
            "ghcr.io/org/payment:v2"
        );
    }

    #[tokio::test]
    async fn test_update_image_retries_transport_errors() {
        let transport = ScriptedTransport::new(vec![
            timeout(),
            ok(r#"{"data":{"serviceInstanceUpdate":true}}"#),
        ]);
        let client = DeploymentClient::with_transport("token", transport.clone());
        let step = UpdateImageStep::new(client, target()).with_retry(fast_retry(3));

        step.execute(&event_with_image("repo/img:v3")).await.unwrap();
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_update_image_gives_up_after_attempts() {
        let transport = ScriptedTransport::new(vec![timeout(), timeout(), timeout()]);
        let client = DeploymentClient::with_transport("token", transport.clone());
        let step = UpdateImageStep::new(client, target()).with_retry(fast_retry(2));

        let err = step.execute(&event_with_image("repo/img:v3")).await.unwrap_err();
        assert!(err.retryable);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_rejection_not_retried() {
        let transport = ScriptedTransport::new(vec![ok(r#"{"errors":[{"message":"Invalid image"}]}"#)]);
        let client = DeploymentClient::with_transport("token", transport.clone());
        let step = UpdateImageStep::new(client, target()).with_retry(fast_retry(3));

        let err = step.execute(&event_with_image("bad")).await.unwrap_err();
        assert!(!err.retryable);
        assert!(err.reason.contains("Invalid image"));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_redeploy_single_attempt() {
        let transport = ScriptedTransport::new(vec![timeout(), ok("{}")]);
        let client = DeploymentClient::with_transport("token", transport.clone());
        let step = RedeployStep::new(client, target());

        let err = step.execute(&event_with_image("x")).await.unwrap_err();
        assert!(err.retryable);
        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.last_request().body.variables["environmentId"], "env-1");
    }

    #[tokio::test]
    async fn test_deploy_step_reports_partial_failure() {
        let transport = ScriptedTransport::new(vec![
            ok(r#"{"data":{"serviceInstanceUpdate":true}}"#),
            ok(r#"{"errors":[{"message":"Environment not found"}]}"#),
        ]);
        let client = DeploymentClient::with_transport("token", transport.clone());
        let step = DeployStep::new(client, target());

        let err = step.execute(&event_with_image("repo/img:v4")).await.unwrap_err();
        assert!(err.reason.contains(&Operation::TriggerRedeploy.to_string()));
        assert!(err.reason.contains("resume at redeploy"));
        assert!(!err.retryable);
    }

    #[test]
    fn test_step_kind_serde() {
        let kinds: Vec<StepKind> =
            serde_json::from_str(r#"["update_image","redeploy","deploy"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![StepKind::UpdateImage, StepKind::Redeploy, StepKind::Deploy]
        );
    }

    #[test]
    fn test_retry_policy_minimum_one_attempt() {
        assert_eq!(RetryPolicy::with_attempts(0).max_attempts, 1);
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
