//! Webhook dispatch
//!
//! Turns a raw webhook request into an orchestrator trigger:
//! verify signature -> parse payload -> resolve dispatch key -> trigger.
//! The signature is checked before anything else is looked at.

use hoist_core::domain::event::TriggerEvent;
use hoist_core::dto::webhook::{TriggerResponse, TriggerStatus, WebhookPayload};
use thiserror::Error;
use tracing::{info, warn};

use crate::service::orchestrator::{Orchestrator, OrchestratorError};
use crate::service::signature::SignaturePolicy;

/// Why a webhook was not turned into a completed trigger
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid or missing webhook signature")]
    Authentication,

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

/// Entry point for inbound webhooks
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    signature: SignaturePolicy,
    orchestrator: Orchestrator,
    fallback_key: Option<String>,
}

impl WebhookDispatcher {
    /// Creates a dispatcher using the registry's fallback key as the default dispatch key
    pub fn new(signature: SignaturePolicy, orchestrator: Orchestrator) -> Self {
        let fallback_key = orchestrator.registry().fallback_key().map(str::to_string);
        Self {
            signature,
            orchestrator,
            fallback_key,
        }
    }

    pub fn signature_policy(&self) -> &SignaturePolicy {
        &self.signature
    }

    /// Authenticates and dispatches one webhook
    ///
    /// An unregistered dispatch key is not an error here: it yields a
    /// response with [`TriggerStatus::Unregistered`].
    pub async fn dispatch(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<TriggerResponse, DispatchError> {
        if !self.signature.check(raw_body, signature_header) {
            warn!(
                "Rejected webhook: {} signature",
                if signature_header.is_some() { "invalid" } else { "missing" }
            );
            return Err(DispatchError::Authentication);
        }

        let payload: WebhookPayload = serde_json::from_slice(raw_body)
            .map_err(|e| DispatchError::MalformedPayload(e.to_string()))?;

        let dispatch_key = payload
            .dispatch_key(self.fallback_key.as_deref())
            .unwrap_or_default();
        let event = TriggerEvent::new(dispatch_key, raw_body.to_vec(), payload.into_fields());

        info!(
            "Trigger {} received for key '{}' (branch: {})",
            event.id,
            event.dispatch_key,
            event.fields.branch.as_deref().unwrap_or("-")
        );

        match self.orchestrator.trigger(&event.dispatch_key, &event).await {
            Ok(completed) => Ok(TriggerResponse {
                trigger_id: completed.trigger_id,
                status: TriggerStatus::Completed,
                dispatch_key: completed.dispatch_key,
                pipeline: Some(completed.pipeline),
                steps: completed.steps,
            }),
            Err(OrchestratorError::Unregistered { key }) => Ok(TriggerResponse {
                trigger_id: event.id,
                status: TriggerStatus::Unregistered,
                dispatch_key: key,
                pipeline: None,
                steps: Vec::new(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::registry::{PipelineRegistry, Step};
    use crate::service::signature::sign;
    use async_trait::async_trait;
    use hoist_core::domain::step::{StepError, StepOutput};
    use std::sync::{Arc, Mutex};

    const SECRET: &[u8] = b"webhook-secret";

    /// Step recording the dispatch keys and images it saw
    struct CapturingStep {
        seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
    }

    #[async_trait]
    impl Step for CapturingStep {
        fn name(&self) -> &str {
            "capture"
        }

        async fn execute(&self, event: &TriggerEvent) -> Result<StepOutput, StepError> {
            self.seen
                .lock()
                .unwrap()
                .push((event.dispatch_key.clone(), event.fields.image.clone()));
            Ok(StepOutput::default())
        }
    }

    fn dispatcher(
        policy: SignaturePolicy,
    ) -> (WebhookDispatcher, Arc<Mutex<Vec<(String, Option<String>)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PipelineRegistry::new().with_fallback("main");
        registry.register(
            "payment-service",
            vec![Arc::new(CapturingStep { seen: seen.clone() }) as Arc<dyn Step>],
        );
        let orchestrator = Orchestrator::new(Arc::new(registry));
        (WebhookDispatcher::new(policy, orchestrator), seen)
    }

    #[tokio::test]
    async fn test_signed_service_event_dispatched() {
        let (dispatcher, seen) = dispatcher(SignaturePolicy::required(SECRET));
        let body = br#"{"service":"payment-service","image":"ghcr.io/org/payment:v2"}"#;

        let response = dispatcher
            .dispatch(body, Some(&sign(SECRET, body)))
            .await
            .unwrap();

        assert_eq!(response.status, TriggerStatus::Completed);
        assert_eq!(response.pipeline.as_deref(), Some("payment-service"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(
                "payment-service".to_string(),
                Some("ghcr.io/org/payment:v2".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_bad_signature_never_dispatches() {
        let (dispatcher, seen) = dispatcher(SignaturePolicy::required(SECRET));
        let body = br#"{"service":"payment-service"}"#;

        let err = dispatcher
            .dispatch(body, Some(&sign(b"wrong", body)))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Authentication));

        let err = dispatcher.dispatch(body, None).await.unwrap_err();
        assert!(matches!(err, DispatchError::Authentication));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let (dispatcher, _) = dispatcher(SignaturePolicy::required(SECRET));
        let body = b"not json";

        let err = dispatcher
            .dispatch(body, Some(&sign(SECRET, body)))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_unregistered_key_is_benign() {
        let (dispatcher, seen) = dispatcher(SignaturePolicy::Disabled);

        let response = dispatcher
            .dispatch(br#"{"service":"inventory-service"}"#, None)
            .await
            .unwrap();

        assert_eq!(response.status, TriggerStatus::Unregistered);
        assert_eq!(response.dispatch_key, "inventory-service");
        assert!(response.pipeline.is_none());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_push_event_uses_branch_key() {
        let (dispatcher, _) = dispatcher(SignaturePolicy::Disabled);

        let response = dispatcher
            .dispatch(br#"{"ref":"refs/heads/develop"}"#, None)
            .await
            .unwrap();

        // "develop" and the "main" fallback are both unregistered
        assert_eq!(response.status, TriggerStatus::Unregistered);
        assert_eq!(response.dispatch_key, "develop");
    }
}
