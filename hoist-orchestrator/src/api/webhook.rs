//! Webhook API Handler

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use hoist_core::dto::webhook::{TriggerResponse, TriggerStatus};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::signature::SIGNATURE_HEADER;

/// POST /webhook
/// Authenticate an artifact-ready notification and run its pipeline
///
/// Responds 200 when the pipeline completed and 202 when no pipeline matched.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<TriggerResponse>)> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let response = state.dispatcher.dispatch(&body, signature).await?;

    let status = match response.status {
        TriggerStatus::Completed => {
            tracing::info!("Pipeline triggered for '{}'", response.dispatch_key);
            StatusCode::OK
        }
        TriggerStatus::Unregistered => StatusCode::ACCEPTED,
    };

    Ok((status, Json(response)))
}
