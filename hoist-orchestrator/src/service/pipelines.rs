//! Pipeline assembly
//!
//! Builds the process-wide registry from configuration at startup.

use anyhow::Result;
use hoist_client::DeploymentClient;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::service::registry::{PipelineRegistry, Step};
use crate::service::steps::{RetryPolicy, StepKind, build_step};

/// Creates the registry for every configured pipeline
pub fn build_registry(config: &Config, client: &DeploymentClient) -> Result<PipelineRegistry> {
    let mut registry =
        PipelineRegistry::new().with_fallback(config.fallback_key.clone().unwrap_or_default());
    let retry = RetryPolicy::with_attempts(config.update_image_attempts);

    for definition in config.pipeline_definitions()? {
        let target = definition.resolve_target(config)?;
        let kinds = if definition.steps.is_empty() {
            StepKind::default_pipeline()
        } else {
            definition.steps.clone()
        };

        let steps: Vec<Arc<dyn Step>> = kinds
            .iter()
            .map(|kind| build_step(*kind, client.clone(), target.clone(), retry))
            .collect();

        info!(
            "Registered pipeline '{}' -> service {} ({:?})",
            definition.key, target.service_id, kinds
        );
        registry.register(definition.key, steps);
    }

    if registry.is_empty() {
        anyhow::bail!("no pipelines configured");
    }

    Ok(registry)
}
