//! Webhook DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::event::EventFields;
use crate::domain::step::StepReport;

/// Inbound webhook body
///
/// Accepts both the build-system notification shape (`service`, `image`) and
/// the Git push shape (`ref`). Unknown attributes are preserved in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "serviceId")]
    pub service_id: Option<String>,
    #[serde(default, alias = "environmentId")]
    pub environment_id: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl WebhookPayload {
    /// Branch name carried by the payload
    ///
    /// An explicit `branch` wins; otherwise it is derived from `ref`
    /// (`refs/heads/main` -> `main`, `refs/heads/feat/x` -> `feat/x`).
    pub fn branch(&self) -> Option<String> {
        if let Some(branch) = non_blank(&self.branch) {
            return Some(branch.to_string());
        }

        let git_ref = non_blank(&self.git_ref)?;
        let name = git_ref
            .strip_prefix("refs/heads/")
            .or_else(|| git_ref.strip_prefix("refs/tags/"))
            .unwrap_or_else(|| git_ref.rsplit('/').next().unwrap_or(git_ref));

        (!name.is_empty()).then(|| name.to_string())
    }

    /// Resolves the dispatch key: service name, then branch, then `fallback`
    pub fn dispatch_key(&self, fallback: Option<&str>) -> Option<String> {
        non_blank(&self.service)
            .map(str::to_string)
            .or_else(|| self.branch())
            .or_else(|| fallback.filter(|f| !f.is_empty()).map(str::to_string))
    }

    /// Converts the payload into event fields
    pub fn into_fields(self) -> EventFields {
        let branch = self.branch();
        let mut extra = self.extra;
        if let Some(service) = self.service {
            extra.insert("service".to_string(), serde_json::Value::String(service));
        }
        if let Some(git_ref) = self.git_ref {
            extra.insert("ref".to_string(), serde_json::Value::String(git_ref));
        }

        EventFields {
            branch,
            image: self.image,
            service_id: self.service_id,
            environment_id: self.environment_id,
            extra,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Result of a dispatched trigger, returned to the event source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub trigger_id: Uuid,
    pub status: TriggerStatus,
    pub dispatch_key: String,
    /// Registry key actually executed (differs from `dispatch_key` on fallback)
    pub pipeline: Option<String>,
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    Completed,
    Unregistered,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_service_wins_over_branch() {
        let payload = parse(json!({"service": "payment-service", "ref": "refs/heads/dev"}));
        assert_eq!(
            payload.dispatch_key(Some("main")).as_deref(),
            Some("payment-service")
        );
    }

    #[test]
    fn test_branch_from_ref() {
        let payload = parse(json!({"ref": "refs/heads/release"}));
        assert_eq!(payload.branch().as_deref(), Some("release"));
        assert_eq!(payload.dispatch_key(Some("main")).as_deref(), Some("release"));
    }

    #[test]
    fn test_branch_with_slash_kept_whole() {
        let payload = parse(json!({"ref": "refs/heads/feat/login"}));
        assert_eq!(payload.branch().as_deref(), Some("feat/login"));
    }

    #[test]
    fn test_unprefixed_ref_uses_last_segment() {
        let payload = parse(json!({"ref": "origin/main"}));
        assert_eq!(payload.branch().as_deref(), Some("main"));
    }

    #[test]
    fn test_fallback_key() {
        let payload = parse(json!({"image": "repo/img:tag"}));
        assert_eq!(payload.dispatch_key(Some("main")).as_deref(), Some("main"));
        assert_eq!(payload.dispatch_key(None), None);
        assert_eq!(payload.dispatch_key(Some("")), None);
    }

    #[test]
    fn test_camel_case_aliases_and_extra() {
        let payload = parse(json!({
            "service": "payment-service",
            "serviceId": "svc-9",
            "environmentId": "env-9",
            "image": "ghcr.io/org/payment:v2",
            "sha": "abc123"
        }));
        let fields = payload.into_fields();
        assert_eq!(fields.service_id.as_deref(), Some("svc-9"));
        assert_eq!(fields.environment_id.as_deref(), Some("env-9"));
        assert_eq!(fields.image.as_deref(), Some("ghcr.io/org/payment:v2"));
        assert_eq!(fields.extra.get("sha"), Some(&json!("abc123")));
        assert_eq!(fields.extra.get("service"), Some(&json!("payment-service")));
    }
}
