use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hoist_client::DeploymentClient;
use hoist_orchestrator::api;
use hoist_orchestrator::config::Config;
use hoist_orchestrator::service::pipelines::build_registry;
use hoist_orchestrator::service::{Orchestrator, WebhookDispatcher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hoist_orchestrator=debug,hoist_client=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Hoist Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let signature = config.signature_policy();
    if !signature.is_required() {
        tracing::warn!("Webhook signature verification is DISABLED (HOIST_REQUIRE_SIGNATURE=false)");
    }

    let client = DeploymentClient::new(config.client_config())
        .context("Failed to create deployment client")?;
    tracing::info!(
        "Deployment client ready: endpoint={}, redeploy_mode={:?}",
        config.api_url,
        config.redeploy_mode
    );

    let registry = build_registry(&config, &client).context("Failed to build pipelines")?;
    tracing::info!(
        "{} pipeline(s) registered: {:?} (fallback: {:?})",
        registry.len(),
        registry.keys(),
        registry.fallback_key()
    );

    let orchestrator = Orchestrator::new(Arc::new(registry));
    let dispatcher = Arc::new(WebhookDispatcher::new(signature, orchestrator));

    let app = api::create_router(dispatcher);

    tracing::info!("Webhook server listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
