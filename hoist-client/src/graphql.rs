//! GraphQL wire envelope

use serde::{Deserialize, Serialize};

/// A GraphQL request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlRequest {
    pub query: String,
    pub variables: serde_json::Value,
}

impl GraphQlRequest {
    pub fn new(query: &str, variables: serde_json::Value) -> Self {
        Self {
            query: query.trim().to_string(),
            variables,
        }
    }
}

/// A GraphQL response body
///
/// Either `data` or a non-empty `errors` list (or both, for partial results).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}
