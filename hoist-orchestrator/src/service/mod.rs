//! Service Module
//!
//! Business logic of the orchestrator: signature verification, the pipeline
//! registry, the dispatch state machine, and the deployment steps.

pub mod dispatch;
pub mod orchestrator;
pub mod pipelines;
pub mod registry;
pub mod signature;
pub mod steps;

pub use dispatch::{DispatchError, WebhookDispatcher};
pub use orchestrator::{Completed, Orchestrator, OrchestratorError};
pub use registry::{Pipeline, PipelineRegistry, Step};
pub use signature::SignaturePolicy;
