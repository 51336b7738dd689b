//! MCPPrompt CRD: a prompt template with declared variables

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::types::{validate_absolute_path, validate_identifier, Condition};
use crate::status::{clear_condition_timestamps, StatusPatch};

// =============================================================================
// CRD
// =============================================================================

/// Spec for an MCPPrompt
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[kube(
    group = "mcp.k8s.turd.ninja",
    version = "v1alpha1",
    kind = "MCPPrompt",
    root = "McpPrompt",
    plural = "mcpprompts",
    shortname = "mcpp",
    namespaced,
    status = "McpPromptStatus",
    printcolumn = r#"{"name":"Validated","type":"boolean","jsonPath":".status.validated"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct McpPromptSpec {
    /// Prompt name
    #[validate(length(min = 1, max = 63, message = "prompt name must be 1-63 characters"))]
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,

    /// Template text with `{{variable}}` placeholders
    #[validate(length(min = 1, max = 10000, message = "template must be 1-10000 characters"))]
    pub template: String,

    /// Variables the template references
    #[serde(default)]
    #[validate(nested)]
    pub variables: Vec<PromptVariable>,

    /// Path the gateway exposes this prompt under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_absolute_path"))]
    pub ingress_path: Option<String>,
}

/// A variable declared by a prompt template
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PromptVariable {
    /// Variable name as used in `{{name}}`
    #[validate(
        length(min = 1, max = 63, message = "variable name must be 1-63 characters"),
        custom(function = "validate_identifier")
    )]
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "description must be at most 200 characters"))]
    pub description: Option<String>,

    /// Whether callers must supply a value
    #[serde(default)]
    pub required: bool,

    /// Value used when the caller supplies none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

// =============================================================================
// Status
// =============================================================================

/// Status for an MCPPrompt
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McpPromptStatus {
    /// Whether template placeholders match the declared variables exactly
    #[serde(default)]
    pub validated: bool,

    /// Time of the last validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validation_time: Option<DateTime<Utc>>,

    /// Current conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl StatusPatch for McpPromptStatus {
    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }

    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn clear_timestamps(&mut self) {
        self.last_validation_time = None;
        clear_condition_timestamps(&mut self.conditions);
    }
}
