//! Deployment target domain types

use serde::{Deserialize, Serialize};

use crate::domain::event::EventFields;

/// The remote service instance a deployment mutates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub service_id: String,
    pub environment_id: String,
    pub image: String,
}

impl DeploymentTarget {
    pub fn new(
        service_id: impl Into<String>,
        environment_id: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            environment_id: environment_id.into(),
            image: image.into(),
        }
    }

    /// Returns a copy of this target with any ids or image carried by the event applied
    ///
    /// Empty strings in the event are ignored.
    pub fn with_overrides(&self, fields: &EventFields) -> Self {
        fn pick(field: &Option<String>, default: &str) -> String {
            field
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        }

        Self {
            service_id: pick(&fields.service_id, &self.service_id),
            environment_id: pick(&fields.environment_id, &self.environment_id),
            image: pick(&fields.image, &self.image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DeploymentTarget {
        DeploymentTarget::new("svc-1", "env-1", "repo/img:latest")
    }

    #[test]
    fn test_overrides_absent_keep_defaults() {
        let target = base().with_overrides(&EventFields::default());
        assert_eq!(target, base());
    }

    #[test]
    fn test_image_override() {
        let fields = EventFields {
            image: Some("ghcr.io/org/payment:v2".to_string()),
            ..Default::default()
        };
        let target = base().with_overrides(&fields);
        assert_eq!(target.image, "ghcr.io/org/payment:v2");
        assert_eq!(target.service_id, "svc-1");
    }

    #[test]
    fn test_blank_override_ignored() {
        let fields = EventFields {
            service_id: Some("  ".to_string()),
            environment_id: Some("env-2".to_string()),
            ..Default::default()
        };
        let target = base().with_overrides(&fields);
        assert_eq!(target.service_id, "svc-1");
        assert_eq!(target.environment_id, "env-2");
    }
}
