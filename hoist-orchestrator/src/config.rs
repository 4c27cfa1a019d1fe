//! Orchestrator configuration
//!
//! Loaded once at startup from environment variables. Components never read
//! the environment themselves; they receive the values they need from here.

use anyhow::{Context, Result};
use hoist_client::{ClientConfig, DEFAULT_ENDPOINT, RedeployMode};
use hoist_core::domain::target::DeploymentTarget;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::service::signature::SignaturePolicy;
use crate::service::steps::StepKind;

/// Image deployed when neither the pipeline nor the event names one
pub const DEFAULT_IMAGE: &str = "ghcr.io/shafqatgreat/payment-service:latest";

/// A pipeline declared in the pipelines file
///
/// Unset ids and image fall back to the `RAILWAY_*` / `IMAGE_NAME` defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub key: String,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub environment_id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Empty means the default `update_image`, `redeploy` sequence
    #[serde(default)]
    pub steps: Vec<StepKind>,
}

impl PipelineDefinition {
    /// Resolves the deployment target against the configured defaults
    pub fn resolve_target(&self, config: &Config) -> Result<DeploymentTarget> {
        let service_id = self
            .service_id
            .clone()
            .or_else(|| config.service_id.clone())
            .with_context(|| format!("pipeline '{}' has no service id", self.key))?;
        let environment_id = self
            .environment_id
            .clone()
            .or_else(|| config.environment_id.clone())
            .with_context(|| format!("pipeline '{}' has no environment id", self.key))?;
        let image = self.image.clone().unwrap_or_else(|| config.image.clone());

        Ok(DeploymentTarget::new(service_id, environment_id, image))
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the webhook server listens on
    pub bind_addr: String,

    /// Shared secret for webhook signatures
    pub webhook_secret: Option<String>,

    /// Reject unsigned webhooks (only an explicit `false` disables this)
    pub require_signature: bool,

    /// Remote GraphQL endpoint
    pub api_url: String,

    /// Bearer credential for the remote API
    pub api_token: String,

    /// Default remote service id
    pub service_id: Option<String>,

    /// Default remote environment id
    pub environment_id: Option<String>,

    /// Default image reference
    pub image: String,

    /// Key of the pipeline built from the defaults when no pipelines file is given
    pub pipeline_key: String,

    /// Dispatch key used when an event names no service or branch, and
    /// pipeline used when a key has no exact match
    pub fallback_key: Option<String>,

    /// Pipelines loaded from `HOIST_PIPELINES_FILE`
    pub pipelines: Option<Vec<PipelineDefinition>>,

    /// Upper bound for each remote call
    pub request_timeout: Duration,

    /// Attempts for the image update step
    pub update_image_attempts: u32,

    /// Phase 2 mutation
    pub redeploy_mode: RedeployMode,
}

impl Config {
    /// Creates a configuration with defaults
    pub fn new(api_token: String, webhook_secret: Option<String>) -> Self {
        Self {
            bind_addr: "0.0.0.0:4000".to_string(),
            webhook_secret,
            require_signature: true,
            api_url: DEFAULT_ENDPOINT.to_string(),
            api_token,
            service_id: None,
            environment_id: None,
            image: DEFAULT_IMAGE.to_string(),
            pipeline_key: "payment-service".to_string(),
            fallback_key: Some("main".to_string()),
            pipelines: None,
            request_timeout: Duration::from_secs(30),
            update_image_attempts: 3,
            redeploy_mode: RedeployMode::default(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - RAILWAY_TOKEN (required)
    /// - GITHUB_SECRET (required unless HOIST_REQUIRE_SIGNATURE=false)
    /// - HOIST_REQUIRE_SIGNATURE (optional, default: true)
    /// - HOIST_BIND_ADDR or PORT (optional, default: 0.0.0.0:4000)
    /// - RAILWAY_API_URL (optional, default: Railway GraphQL v2)
    /// - RAILWAY_SERVICE_ID, RAILWAY_ENVIRONMENT_ID (required without a pipelines file)
    /// - IMAGE_NAME (optional)
    /// - HOIST_PIPELINE_KEY (optional, default: payment-service)
    /// - HOIST_FALLBACK_KEY (optional, default: main; empty disables)
    /// - HOIST_PIPELINES_FILE (optional, JSON array of pipeline definitions)
    /// - HOIST_REQUEST_TIMEOUT (optional, seconds, default: 30)
    /// - HOIST_UPDATE_IMAGE_ATTEMPTS (optional, default: 3)
    /// - HOIST_REDEPLOY_MODE (optional, redeploy|deploy, default: redeploy)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup("RAILWAY_TOKEN")
            .ok_or_else(|| anyhow::anyhow!("RAILWAY_TOKEN environment variable not set"))?;

        let mut config = Self::new(api_token, lookup("GITHUB_SECRET"));

        if let Some(addr) = lookup("HOIST_BIND_ADDR") {
            config.bind_addr = addr;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port.parse().context("PORT must be a port number")?;
            config.bind_addr = format!("0.0.0.0:{}", port);
        }

        if let Some(flag) = lookup("HOIST_REQUIRE_SIGNATURE") {
            config.require_signature = parse_bool(&flag)
                .with_context(|| format!("invalid HOIST_REQUIRE_SIGNATURE '{}'", flag))?;
        }

        if let Some(url) = lookup("RAILWAY_API_URL") {
            config.api_url = url;
        }
        config.service_id = lookup("RAILWAY_SERVICE_ID").filter(|s| !s.is_empty());
        config.environment_id = lookup("RAILWAY_ENVIRONMENT_ID").filter(|s| !s.is_empty());
        if let Some(image) = lookup("IMAGE_NAME").filter(|s| !s.is_empty()) {
            config.image = image;
        }
        if let Some(key) = lookup("HOIST_PIPELINE_KEY") {
            config.pipeline_key = key;
        }
        if let Some(key) = lookup("HOIST_FALLBACK_KEY") {
            config.fallback_key = (!key.is_empty()).then_some(key);
        }

        if let Some(path) = lookup("HOIST_PIPELINES_FILE") {
            config.pipelines = Some(load_pipelines(Path::new(&path))?);
        }

        if let Some(secs) = lookup("HOIST_REQUEST_TIMEOUT") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("invalid HOIST_REQUEST_TIMEOUT '{}'", secs))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(attempts) = lookup("HOIST_UPDATE_IMAGE_ATTEMPTS") {
            config.update_image_attempts = attempts
                .parse()
                .with_context(|| format!("invalid HOIST_UPDATE_IMAGE_ATTEMPTS '{}'", attempts))?;
        }

        if let Some(mode) = lookup("HOIST_REDEPLOY_MODE") {
            config.redeploy_mode = mode
                .parse::<RedeployMode>()
                .map_err(|e| anyhow::anyhow!(e))?;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            anyhow::bail!("api_token cannot be empty");
        }

        if self.require_signature
            && self
                .webhook_secret
                .as_deref()
                .is_none_or(|s| s.is_empty())
        {
            anyhow::bail!(
                "webhook secret is required; set GITHUB_SECRET or explicitly disable with HOIST_REQUIRE_SIGNATURE=false"
            );
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.update_image_attempts == 0 {
            anyhow::bail!("update_image_attempts must be at least 1");
        }

        for definition in self.pipeline_definitions()? {
            if definition.key.trim().is_empty() {
                anyhow::bail!("pipeline key cannot be empty");
            }
            definition.resolve_target(self)?;
        }

        Ok(())
    }

    /// Pipelines to register: the pipelines file, or a single pipeline built
    /// from the defaults
    pub fn pipeline_definitions(&self) -> Result<Vec<PipelineDefinition>> {
        if let Some(pipelines) = &self.pipelines {
            return Ok(pipelines.clone());
        }

        if self.service_id.is_none() || self.environment_id.is_none() {
            anyhow::bail!(
                "RAILWAY_SERVICE_ID and RAILWAY_ENVIRONMENT_ID must be set when no pipelines file is configured"
            );
        }

        Ok(vec![PipelineDefinition {
            key: self.pipeline_key.clone(),
            service_id: None,
            environment_id: None,
            image: None,
            steps: StepKind::default_pipeline(),
        }])
    }

    /// The webhook signature policy
    pub fn signature_policy(&self) -> SignaturePolicy {
        match (&self.webhook_secret, self.require_signature) {
            (Some(secret), true) => SignaturePolicy::required(secret.as_bytes()),
            // validate() rejects a required signature without a secret; an
            // empty secret here still fails every verification
            (None, true) => SignaturePolicy::required(Vec::new()),
            (_, false) => SignaturePolicy::Disabled,
        }
    }

    /// Deployment client settings
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.api_url.clone(),
            token: self.api_token.clone(),
            timeout: self.request_timeout,
            redeploy_mode: self.redeploy_mode,
            ..ClientConfig::new(self.api_token.clone())
        }
    }

    #[cfg(test)]
    pub(crate) fn for_service(key: &str, service_id: &str, environment_id: &str) -> Self {
        let mut config = Self::new("token".to_string(), Some("secret".to_string()));
        config.pipeline_key = key.to_string();
        config.service_id = Some(service_id.to_string());
        config.environment_id = Some(environment_id.to_string());
        config
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

fn load_pipelines(path: &Path) -> Result<Vec<PipelineDefinition>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipelines file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse pipelines file {}", path.display()))
}
