//! Pipeline registry
//!
//! Maps dispatch keys to ordered step lists. Built once at startup, then
//! shared read-only (behind an `Arc`) by every trigger.

use async_trait::async_trait;
use hoist_core::domain::event::TriggerEvent;
use hoist_core::domain::step::{StepError, StepOutput};
use std::collections::HashMap;
use std::sync::Arc;

/// A unit of work in a pipeline
///
/// Steps hold no per-trigger state, so one instance can serve concurrent
/// triggers for the same key.
#[async_trait]
pub trait Step: Send + Sync {
    /// Name used in logs and reports
    fn name(&self) -> &str;

    /// Runs the step for one event
    async fn execute(&self, event: &TriggerEvent) -> Result<StepOutput, StepError>;
}

/// An ordered sequence of steps registered under a key
#[derive(Clone)]
pub struct Pipeline {
    key: String,
    steps: Vec<Arc<dyn Step>>,
}

impl Pipeline {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("key", &self.key)
            .field("steps", &self.step_names())
            .finish()
    }
}

/// Registry of pipelines by dispatch key
#[derive(Debug, Default)]
pub struct PipelineRegistry {
    pipelines: HashMap<String, Pipeline>,
    fallback_key: Option<String>,
}

impl PipelineRegistry {
    /// Creates an empty registry without a fallback key
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key used when a dispatch key has no exact match
    ///
    /// An empty key disables the fallback.
    pub fn with_fallback(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.fallback_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Registers the pipeline for `key`, replacing any previous one
    ///
    /// Returns the replaced pipeline, if any.
    pub fn register(&mut self, key: impl Into<String>, steps: Vec<Arc<dyn Step>>) -> Option<Pipeline> {
        let key = key.into();
        let pipeline = Pipeline {
            key: key.clone(),
            steps,
        };

        let replaced = self.pipelines.insert(key.clone(), pipeline);
        if replaced.is_some() {
            tracing::warn!("Pipeline '{}' registered twice; last registration wins", key);
        }
        replaced
    }

    /// Exact-match lookup
    pub fn resolve(&self, key: &str) -> Option<&Pipeline> {
        self.pipelines.get(key)
    }

    /// Exact-match lookup, then the fallback key
    pub fn resolve_or_fallback(&self, key: &str) -> Option<&Pipeline> {
        self.resolve(key).or_else(|| {
            self.fallback_key
                .as_deref()
                .and_then(|fallback| self.pipelines.get(fallback))
        })
    }

    pub fn fallback_key(&self) -> Option<&str> {
        self.fallback_key.as_deref()
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
