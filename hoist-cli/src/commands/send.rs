//! Send command handler
//!
//! Posts a payload to the orchestrator the same way the build system does.

use anyhow::{Context, Result};
use colored::*;
use hoist_core::dto::webhook::WebhookPayload;
use hoist_orchestrator::service::signature::{SIGNATURE_HEADER, sign};

use crate::config::Config;

/// Sends `payload` to `url`, signed unless `unsigned` is set
pub async fn handle_send(url: &str, payload: &[u8], unsigned: bool, config: &Config) -> Result<()> {
    let parsed: WebhookPayload =
        serde_json::from_slice(payload).context("Payload is not a valid webhook body")?;
    if let Some(key) = parsed.dispatch_key(None) {
        println!("{} {}", "Dispatch key:".bold(), key);
    }

    let mut request = reqwest::Client::new()
        .post(url)
        .header("content-type", "application/json")
        .body(payload.to_vec());

    if !unsigned {
        let secret = config.require_secret()?;
        request = request.header(SIGNATURE_HEADER, sign(secret.as_bytes(), payload));
    }

    let response = request
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let label = format!("{}", status);
    if status.is_success() {
        println!("{} {}", "Status:".bold(), label.green());
    } else if status.is_client_error() {
        println!("{} {}", "Status:".bold(), label.yellow());
    } else {
        println!("{} {}", "Status:".bold(), label.red());
    }

    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", body),
    }

    if status.is_server_error() {
        anyhow::bail!("orchestrator reported a pipeline failure");
    }

    Ok(())
}
