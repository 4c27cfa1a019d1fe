//! API Module
//!
//! HTTP API layer for the orchestrator.

pub mod error;
pub mod health;
pub mod webhook;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::WebhookDispatcher;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<WebhookDispatcher>,
}

/// Create the main API router with all endpoints
pub fn create_router(dispatcher: Arc<WebhookDispatcher>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/webhook", post(webhook::receive_webhook))
        .with_state(AppState { dispatcher })
        .layer(TraceLayer::new_for_http())
}
