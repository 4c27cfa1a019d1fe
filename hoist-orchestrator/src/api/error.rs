//! API Error Handling
//!
//! Maps dispatch failures onto HTTP responses. This is the only place that
//! decides what the event source sees.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::{DispatchError, OrchestratorError};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    PipelineFailed {
        message: String,
        pipeline: String,
        step: String,
        index: usize,
        retryable: bool,
    },
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, serde_json::json!({ "error": msg }))
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::PipelineFailed {
                message,
                pipeline,
                step,
                index,
                retryable,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": message,
                    "pipeline": pipeline,
                    "failed_step": step,
                    "step_index": index,
                    "retryable": retryable,
                }),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": msg }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Authentication => ApiError::Unauthorized("Invalid signature".to_string()),
            DispatchError::MalformedPayload(msg) => ApiError::BadRequest(msg),
            DispatchError::Orchestrator(OrchestratorError::StepFailure {
                pipeline,
                index,
                step,
                reason,
                retryable,
                ..
            }) => ApiError::PipelineFailed {
                message: format!("Pipeline failed: {}", reason),
                pipeline,
                step,
                index,
                retryable,
            },
            DispatchError::Orchestrator(other) => ApiError::InternalError(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
