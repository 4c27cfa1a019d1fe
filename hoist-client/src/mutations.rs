//! Deployment mutations

use hoist_core::domain::target::DeploymentTarget;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::{info, warn};

use crate::DeploymentClient;
use crate::error::{DeployError, Operation, Result};
use crate::graphql::GraphQlRequest;

const UPDATE_IMAGE_MUTATION: &str = r#"
mutation ServiceInstanceUpdate($serviceId: String!, $image: String!) {
  serviceInstanceUpdate(serviceId: $serviceId, input: { source: { image: $image } })
}
"#;

const REDEPLOY_MUTATION: &str = r#"
mutation ServiceInstanceRedeploy($serviceId: String!, $environmentId: String!) {
  serviceInstanceRedeploy(serviceId: $serviceId, environmentId: $environmentId)
}
"#;

const DEPLOY_MUTATION: &str = r#"
mutation ServiceInstanceDeploy($serviceId: String!, $environmentId: String!) {
  serviceInstanceDeploy(serviceId: $serviceId, environmentId: $environmentId)
}
"#;

/// Which mutation phase 2 issues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeployMode {
    /// `serviceInstanceRedeploy`: restart the latest deployment
    #[default]
    Redeploy,
    /// `serviceInstanceDeploy`: start a fresh deployment (wakes a stopped service)
    Deploy,
}

impl RedeployMode {
    fn mutation(self) -> &'static str {
        match self {
            RedeployMode::Redeploy => REDEPLOY_MUTATION,
            RedeployMode::Deploy => DEPLOY_MUTATION,
        }
    }
}

impl FromStr for RedeployMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redeploy" => Ok(RedeployMode::Redeploy),
            "deploy" => Ok(RedeployMode::Deploy),
            other => Err(format!(
                "unknown redeploy mode '{}' (expected 'redeploy' or 'deploy')",
                other
            )),
        }
    }
}

/// Result of a completed two-phase deployment
#[derive(Debug, Clone, PartialEq)]
pub struct DeployOutcome {
    pub target: DeploymentTarget,
    /// `data` returned by phase 1
    pub update: serde_json::Value,
    /// `data` returned by phase 2
    pub redeploy: serde_json::Value,
}

impl DeploymentClient {
    // =============================================================================
    // Deployment Mutations
    // =============================================================================

    /// Phase 1: sets the image reference of a service
    ///
    /// Idempotent; repeating it with the same image has no further effect.
    pub async fn update_image(&self, service_id: &str, image: &str) -> Result<serde_json::Value> {
        let request = GraphQlRequest::new(
            UPDATE_IMAGE_MUTATION,
            json!({ "serviceId": service_id, "image": image }),
        );

        self.execute(Operation::UpdateImage, request).await
    }

    /// Phase 2: restarts a service instance in an environment
    ///
    /// Not idempotent: every call may cause another restart.
    pub async fn trigger_redeploy(
        &self,
        service_id: &str,
        environment_id: &str,
    ) -> Result<serde_json::Value> {
        let request = GraphQlRequest::new(
            self.redeploy_mode.mutation(),
            json!({ "serviceId": service_id, "environmentId": environment_id }),
        );

        self.execute(Operation::TriggerRedeploy, request).await
    }

    /// Runs both phases in order
    ///
    /// Phase 2 starts only after phase 1 returned successfully. Nothing is
    /// rolled back if phase 2 fails.
    pub async fn deploy(
        &self,
        target: &DeploymentTarget,
    ) -> std::result::Result<DeployOutcome, DeployError> {
        info!(
            "Updating service {} to image {}",
            target.service_id, target.image
        );

        let update = self
            .update_image(&target.service_id, &target.image)
            .await
            .map_err(|source| DeployError {
                phase: Operation::UpdateImage,
                source,
            })?;

        info!(
            "Image updated, triggering redeploy of {} in environment {}",
            target.service_id, target.environment_id
        );

        let redeploy = self
            .trigger_redeploy(&target.service_id, &target.environment_id)
            .await
            .map_err(|source| {
                warn!(
                    "Image for {} updated but redeploy failed; service is not restarted",
                    target.service_id
                );
                DeployError {
                    phase: Operation::TriggerRedeploy,
                    source,
                }
            })?;

        Ok(DeployOutcome {
            target: target.clone(),
            update,
            redeploy,
        })
    }
}
