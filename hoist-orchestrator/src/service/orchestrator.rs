//! Orchestrator
//!
//! Dispatch state machine for one trigger:
//!
//! ```text
//! Received -> Resolved -> Running(0) -> ... -> Running(n-1) -> Completed
//!     |                        |
//!     v                        v
//! Unregistered               Failed
//! ```
//!
//! Steps run strictly in registration order; the first failure stops the
//! pipeline and later steps never run. Nothing is retried or rolled back here.

use hoist_core::domain::event::TriggerEvent;
use hoist_core::domain::step::{StepOutcome, StepReport};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use crate::service::registry::PipelineRegistry;

/// Progress of a single trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Received,
    Resolved,
    Running(usize),
    Completed,
    Failed,
    Unregistered,
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerState::Running(index) => write!(f, "Running({})", index),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A pipeline that ran every step successfully
#[derive(Debug, Clone)]
pub struct Completed {
    pub trigger_id: Uuid,
    pub dispatch_key: String,
    /// Registry key that was executed
    pub pipeline: String,
    pub steps: Vec<StepReport>,
}

/// Why a trigger did not complete
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// No pipeline for the key and no usable fallback
    #[error("no pipeline registered for '{key}'")]
    Unregistered { key: String },

    /// A step failed; steps after `index` were skipped
    #[error("step {index} ({step}) of pipeline '{pipeline}' failed: {reason}")]
    StepFailure {
        pipeline: String,
        index: usize,
        step: String,
        reason: String,
        retryable: bool,
        /// Reports for the steps that ran, including the failed one
        steps: Vec<StepReport>,
    },
}

impl OrchestratorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrchestratorError::StepFailure { retryable: true, .. })
    }
}

/// Stateless dispatcher over a read-only registry
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<PipelineRegistry>,
}

impl Orchestrator {
    pub fn new(registry: Arc<PipelineRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    /// Resolves the pipeline for `key` and runs it for `event`
    pub async fn trigger(
        &self,
        key: &str,
        event: &TriggerEvent,
    ) -> Result<Completed, OrchestratorError> {
        let span = tracing::info_span!("trigger", trigger_id = %event.id, key = %key);
        self.run(key, event).instrument(span).await
    }

    async fn run(&self, key: &str, event: &TriggerEvent) -> Result<Completed, OrchestratorError> {
        let mut state = TriggerState::Received;
        debug!("State: {}", state);

        let Some(pipeline) = self.registry.resolve_or_fallback(key) else {
            state = TriggerState::Unregistered;
            warn!("No pipeline registered for key '{}' (state: {})", key, state);
            return Err(OrchestratorError::Unregistered {
                key: key.to_string(),
            });
        };

        state = TriggerState::Resolved;
        if pipeline.key() != key {
            info!(
                "No pipeline for '{}', using fallback pipeline '{}'",
                key,
                pipeline.key()
            );
        }
        debug!("State: {} ({} steps)", state, pipeline.steps().len());

        info!("Starting pipeline '{}'", pipeline.key());

        let mut reports = Vec::with_capacity(pipeline.steps().len());
        for (index, step) in pipeline.steps().iter().enumerate() {
            state = TriggerState::Running(index);
            debug!("State: {} - step '{}'", state, step.name());

            let result = step.execute(event).await;
            let failure = result.as_ref().err().cloned();
            reports.push(StepReport {
                index,
                name: step.name().to_string(),
                outcome: StepOutcome::from(result),
            });

            if let Some(err) = failure {
                state = TriggerState::Failed;
                error!(
                    "Step {} ({}) of pipeline '{}' failed (retryable: {}): {} (state: {})",
                    index,
                    step.name(),
                    pipeline.key(),
                    err.retryable,
                    err.reason,
                    state
                );
                return Err(OrchestratorError::StepFailure {
                    pipeline: pipeline.key().to_string(),
                    index,
                    step: step.name().to_string(),
                    reason: err.reason,
                    retryable: err.retryable,
                    steps: reports,
                });
            }
        }

        state = TriggerState::Completed;
        info!("Pipeline '{}' completed (state: {})", pipeline.key(), state);

        Ok(Completed {
            trigger_id: event.id,
            dispatch_key: key.to_string(),
            pipeline: pipeline.key().to_string(),
            steps: reports,
        })
    }
}
