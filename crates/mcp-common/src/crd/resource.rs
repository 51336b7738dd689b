//! MCPResource CRD: data exposed to MCP clients either through HTTP
//! operations on backend Services or as inline content

use chrono::{DateTime, Utc};
use kube::CustomResource;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::types::{
    validate_absolute_path, validate_identifier, Condition, HttpMethod, ServiceReference,
};
use crate::status::{clear_condition_timestamps, StatusPatch};

static MIME_TYPE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+/[a-z0-9+.-]+$").expect("mime type regex is valid"));

fn validate_mime_type(mime: &str) -> Result<(), ValidationError> {
    if MIME_TYPE_REGEX.is_match(mime) {
        return Ok(());
    }
    let mut err = ValidationError::new("mime_type");
    err.message = Some(format!("'{mime}' is not a valid mime type").into());
    Err(err)
}

// =============================================================================
// CRD
// =============================================================================

/// Spec for an MCPResource
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[kube(
    group = "mcp.k8s.turd.ninja",
    version = "v1alpha1",
    kind = "MCPResource",
    root = "McpResource",
    plural = "mcpresources",
    shortname = "mcpr",
    namespaced,
    status = "McpResourceStatus",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Operations","type":"integer","jsonPath":".status.operationCount"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct McpResourceSpec {
    /// Resource name
    #[validate(length(min = 1, max = 63, message = "resource name must be 1-63 characters"))]
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,

    /// HTTP operations backing this resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub operations: Option<Vec<ResourceOperation>>,

    /// Inline content served directly by the gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub content: Option<InlineContent>,
}

/// An HTTP operation on a backend Service
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOperation {
    /// HTTP method
    pub method: HttpMethod,

    /// Path the gateway exposes this operation under
    #[validate(custom(function = "validate_absolute_path"))]
    pub ingress_path: String,

    /// Backend Service
    #[validate(nested)]
    pub service: ServiceReference,

    /// Parameters accepted by the operation
    #[serde(default)]
    #[validate(nested)]
    pub parameters: Vec<OperationParameter>,
}

/// Where an operation parameter is carried
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Path segment
    Path,
    /// Query string
    Query,
    /// HTTP header
    Header,
}

/// A parameter accepted by a resource operation
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
pub struct OperationParameter {
    /// Parameter name
    #[validate(
        length(min = 1, max = 63, message = "parameter name must be 1-63 characters"),
        custom(function = "validate_identifier")
    )]
    pub name: String,

    /// Where the parameter is carried
    #[serde(rename = "in")]
    pub location: ParameterLocation,

    /// Whether the parameter must be supplied
    #[serde(default)]
    pub required: bool,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "description must be at most 200 characters"))]
    pub description: Option<String>,
}

fn default_mime_type() -> String {
    "text/plain".to_string()
}

/// Content served verbatim by the gateway
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InlineContent {
    /// Resource URI advertised to clients
    #[validate(length(min = 1, max = 500, message = "uri must be 1-500 characters"))]
    pub uri: String,

    /// MIME type of the content
    #[serde(default = "default_mime_type")]
    #[validate(custom(function = "validate_mime_type"))]
    pub mime_type: String,

    /// Text payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100000, message = "text must be at most 100000 characters"))]
    pub text: Option<String>,

    /// Base64-encoded binary payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl InlineContent {
    /// Returns true if either payload has non-whitespace data
    pub fn has_data(&self) -> bool {
        let non_blank = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        non_blank(&self.text) || non_blank(&self.blob)
    }
}

// =============================================================================
// Status
// =============================================================================

/// Status for an MCPResource
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McpResourceStatus {
    /// Whether the resource is servable
    #[serde(default)]
    pub ready: bool,

    /// Number of declared operations (0 for inline content)
    #[serde(default)]
    pub operation_count: i32,

    /// Time of the last sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,

    /// Current conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl StatusPatch for McpResourceStatus {
    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }

    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn clear_timestamps(&mut self) {
        self.last_sync_time = None;
        clear_condition_timestamps(&mut self.conditions);
    }
}
