//! MCPTool CRD: one or more HTTP tools exposed by a backend Service
//!
//! A tool object runs in exactly one of two modes. Single-tool mode sets
//! `name` and describes one tool served at `service.path`. Multi-tool mode
//! sets `tools` and describes several tools sharing one Service, each with
//! its own path.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::types::{
    preserve_unknown_object, validate_absolute_path, Condition, HttpMethod, ServiceReference,
};
use crate::status::{clear_condition_timestamps, StatusPatch};

// =============================================================================
// CRD
// =============================================================================

/// Spec for an MCPTool
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[kube(
    group = "mcp.k8s.turd.ninja",
    version = "v1alpha1",
    kind = "MCPTool",
    root = "McpTool",
    plural = "mcptools",
    shortname = "mcpt",
    namespaced,
    status = "McpToolStatus",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Endpoint","type":"string","jsonPath":".status.resolvedEndpoint"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_tool_mode"))]
pub struct McpToolSpec {
    /// Tool name in single-tool mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 63, message = "tool name must be 1-63 characters"))]
    pub name: Option<String>,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,

    /// Tools served by the shared Service in multi-tool mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "tools must not be empty"), nested)]
    pub tools: Option<Vec<ToolEntry>>,

    /// Backend Service serving the tool(s)
    #[validate(nested)]
    pub service: ServiceReference,

    /// JSON schema of the tool input in single-tool mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub input_schema: Option<serde_json::Value>,

    /// HTTP method used to invoke the tool
    #[serde(default)]
    pub method: HttpMethod,

    /// Path the gateway exposes this tool under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_absolute_path"))]
    pub ingress_path: Option<String>,
}

fn default_entry_path() -> String {
    "/".to_string()
}

/// One tool in multi-tool mode
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ToolEntry {
    /// Tool name
    #[validate(length(min = 1, max = 63, message = "tool name must be 1-63 characters"))]
    pub name: String,

    /// Path on the shared Service, replacing `service.path`
    #[serde(default = "default_entry_path")]
    #[validate(custom(function = "validate_absolute_path"))]
    pub path: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,

    /// JSON schema of the tool input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub input_schema: Option<serde_json::Value>,

    /// HTTP method used to invoke the tool
    #[serde(default)]
    pub method: HttpMethod,
}

/// Which of the two tool modes a spec is in
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToolMode<'a> {
    /// `name` is set
    Single(&'a str),
    /// `tools` is set
    Multi(&'a [ToolEntry]),
}

impl McpToolSpec {
    /// Determine the tool mode, or `None` if the spec sets both or neither
    pub fn mode(&self) -> Option<ToolMode<'_>> {
        match (&self.name, &self.tools) {
            (Some(name), None) => Some(ToolMode::Single(name)),
            (None, Some(tools)) => Some(ToolMode::Multi(tools)),
            _ => None,
        }
    }
}

fn validate_tool_mode(spec: &McpToolSpec) -> Result<(), ValidationError> {
    if spec.mode().is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("tool_mode");
    err.message = Some(if spec.name.is_some() {
        "exactly one of name or tools must be set, not both".into()
    } else {
        "exactly one of name or tools must be set".into()
    });
    Err(err)
}

// =============================================================================
// Status
// =============================================================================

/// Status for an MCPTool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McpToolStatus {
    /// Whether the backing Service was found
    #[serde(default)]
    pub ready: bool,

    /// Cluster-DNS URL of the tool; null when the Service is missing
    #[serde(default)]
    pub resolved_endpoint: Option<String>,

    /// Last successful resolution time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,

    /// Current conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl StatusPatch for McpToolStatus {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_from_yaml(yaml: &str) -> McpToolSpec {
        serde_yaml::from_str(yaml).expect("tool spec should parse")
    }

    /// Story: a single-tool manifest with defaults
    #[test]
    fn story_single_tool_manifest() {
        let spec = spec_from_yaml(
            r#"
name: echo
service:
  name: echo-svc
  port: 80
inputSchema:
  type: object
  properties:
    text: { type: string }
"#,
        );

        assert!(spec.validate().is_ok());
        assert_eq!(spec.mode(), Some(ToolMode::Single("echo")));
        assert_eq!(spec.method, HttpMethod::Post);
        assert_eq!(spec.service.path, "/");
        assert_eq!(
            spec.input_schema.as_ref().and_then(|s| s["properties"]["text"]["type"].as_str()),
            Some("string")
        );
    }

    /// Story: one Service exposing several tools
    #[test]
    fn story_multi_tool_manifest() {
        let spec = spec_from_yaml(
            r#"
tools:
  - name: a
    path: /a
  - name: b
    path: /b
    method: GET
service:
  name: svc
  port: 80
"#,
        );

        assert!(spec.validate().is_ok());
        match spec.mode() {
            Some(ToolMode::Multi(entries)) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[1].method, HttpMethod::Get);
            }
            other => panic!("expected multi-tool mode, got {other:?}"),
        }
    }

    /// Story: name and tools are mutually exclusive and one is required
    #[test]
    fn story_tool_mode_is_exclusive() {
        let both = spec_from_yaml(
            r#"
name: echo
tools:
  - name: a
service: { name: svc, port: 80 }
"#,
        );
        assert!(both.mode().is_none());
        assert!(both.validate().is_err());

        let neither = spec_from_yaml("service: { name: svc, port: 80 }");
        assert!(neither.mode().is_none());
        assert!(neither.validate().is_err());
    }

    #[test]
    fn nested_constraints_are_checked() {
        let empty_tools = spec_from_yaml("tools: []\nservice: { name: svc, port: 80 }");
        assert!(empty_tools.validate().is_err());

        let bad_entry_path =
            spec_from_yaml("tools:\n  - name: a\n    path: a\nservice: { name: svc, port: 80 }");
        assert!(bad_entry_path.validate().is_err());

        let bad_port = spec_from_yaml("name: echo\nservice: { name: svc, port: 70000 }");
        assert!(bad_port.validate().is_err());

        let bad_ingress =
            spec_from_yaml("name: echo\ningressPath: echo\nservice: { name: svc, port: 80 }");
        assert!(bad_ingress.validate().is_err());
    }

    #[test]
    fn unresolved_endpoint_serializes_as_null() {
        let status = McpToolStatus::default();
        let json = serde_json::to_value(&status).expect("should serialize");
        assert!(json.get("resolvedEndpoint").is_some_and(|v| v.is_null()));
    }
}
