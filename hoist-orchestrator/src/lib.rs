//! Hoist Orchestrator
//!
//! Receives "image ready" webhooks, authenticates them, picks a pipeline by
//! service or branch, and drives the remote deployment API through it.
//!
//! Architecture:
//! - Configuration: loaded once from the environment
//! - Services: signature verification, pipeline registry, orchestrator, steps
//! - API: axum handlers mapping dispatch results onto HTTP responses

pub mod api;
pub mod config;
pub mod service;
