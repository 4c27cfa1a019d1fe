//! Trigger event domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An inbound deployment trigger
///
/// Built once per webhook request at the boundary and never mutated afterwards.
/// Steps receive it by shared reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub id: Uuid,
    pub received_at: chrono::DateTime<chrono::Utc>,
    pub dispatch_key: String,
    /// Raw request bytes, kept only for signature verification
    #[serde(skip)]
    pub raw_body: Vec<u8>,
    pub fields: EventFields,
}

impl TriggerEvent {
    /// Creates a new event with a fresh id and the current timestamp
    pub fn new(dispatch_key: impl Into<String>, raw_body: Vec<u8>, fields: EventFields) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: chrono::Utc::now(),
            dispatch_key: dispatch_key.into(),
            raw_body,
            fields,
        }
    }
}

/// Payload attributes extracted from the webhook body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFields {
    pub branch: Option<String>,
    pub image: Option<String>,
    pub service_id: Option<String>,
    pub environment_id: Option<String>,
    /// Any other top-level payload attributes
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}
