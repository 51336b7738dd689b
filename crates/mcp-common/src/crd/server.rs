//! MCPServer CRD: an aggregating gateway Deployment fed by label-selected
//! tools, prompts and resources

use kube::CustomResource;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::types::{Condition, LabelSelector};
use crate::status::{clear_condition_timestamps, StatusPatch};

/// Image used when the spec does not name one
pub const DEFAULT_SERVER_IMAGE: &str = "ghcr.io/atippey/mcp-echo-server:latest";

static PATH_PREFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/[a-z0-9/-]*$").expect("path prefix regex is valid"));

static DURATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(s|m|h)$").expect("duration regex is valid"));

fn validate_path_prefix(prefix: &str) -> Result<(), ValidationError> {
    if PATH_PREFIX_REGEX.is_match(prefix) {
        return Ok(());
    }
    let mut err = ValidationError::new("path_prefix");
    err.message = Some(
        format!("pathPrefix '{prefix}' must start with '/' and use lowercase letters, digits, '-' or '/'")
            .into(),
    );
    Err(err)
}

fn validate_duration(duration: &str) -> Result<(), ValidationError> {
    if DURATION_REGEX.is_match(duration) {
        return Ok(());
    }
    let mut err = ValidationError::new("duration");
    err.message = Some(format!("'{duration}' must be a number followed by s, m or h").into());
    Err(err)
}

// =============================================================================
// CRD
// =============================================================================

fn default_replicas() -> i32 {
    1
}

fn default_image() -> String {
    DEFAULT_SERVER_IMAGE.to_string()
}

/// Spec for an MCPServer
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[kube(
    group = "mcp.k8s.turd.ninja",
    version = "v1alpha1",
    kind = "MCPServer",
    root = "McpServer",
    plural = "mcpservers",
    shortname = "mcps",
    namespaced,
    status = "McpServerStatus",
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Tools","type":"integer","jsonPath":".status.toolCount"}"#,
    printcolumn = r#"{"name":"Prompts","type":"integer","jsonPath":".status.promptCount"}"#,
    printcolumn = r#"{"name":"Resources","type":"integer","jsonPath":".status.resourceCount"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct McpServerSpec {
    /// Gateway replica count
    #[serde(default = "default_replicas")]
    #[validate(range(min = 1, max = 10, message = "replicas must be between 1 and 10"))]
    pub replicas: i32,

    /// Gateway container image
    #[serde(default = "default_image")]
    #[validate(length(min = 1, message = "image must not be empty"))]
    pub image: String,

    /// Redis used by the gateway for session state
    #[validate(nested)]
    pub redis: RedisConfig,

    /// Optional external exposure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub ingress: Option<IngressConfig>,

    /// Selects the tools, prompts and resources aggregated by this server
    pub tool_selector: LabelSelector,

    /// Gateway runtime tuning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub config: Option<ServerConfig>,
}

/// Redis connection settings
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedisConfig {
    /// Name of the Redis Service in the server's namespace
    #[validate(length(min = 1, max = 253, message = "redis serviceName must be 1-253 characters"))]
    pub service_name: String,
}

fn default_path_prefix() -> String {
    "/mcp".to_string()
}

/// Ingress settings
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IngressConfig {
    /// Host name to route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 253, message = "host must be 1-253 characters"))]
    pub host: Option<String>,

    /// Secret holding the TLS certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 253, message = "tlsSecretName must be 1-253 characters"))]
    pub tls_secret_name: Option<String>,

    /// Path prefix routed to the gateway
    #[serde(default = "default_path_prefix")]
    #[validate(custom(function = "validate_path_prefix"))]
    pub path_prefix: String,
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

fn default_max_concurrent_requests() -> i32 {
    100
}

/// Gateway runtime settings
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Per-request timeout such as `30s`, `5m` or `1h`
    #[serde(default = "default_request_timeout")]
    #[validate(custom(function = "validate_duration"))]
    pub request_timeout: String,

    /// Upper bound on in-flight requests
    #[serde(default = "default_max_concurrent_requests")]
    #[validate(range(
        min = 1,
        max = 10000,
        message = "maxConcurrentRequests must be between 1 and 10000"
    ))]
    pub max_concurrent_requests: i32,
}

// =============================================================================
// Status
// =============================================================================

/// Status for an MCPServer
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McpServerStatus {
    /// Ready replicas reported by the gateway Deployment
    #[serde(default)]
    pub ready_replicas: i32,

    /// Number of aggregated tool entries
    #[serde(default)]
    pub tool_count: i32,

    /// Number of aggregated prompts
    #[serde(default)]
    pub prompt_count: i32,

    /// Number of aggregated resources
    #[serde(default)]
    pub resource_count: i32,

    /// Current conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl StatusPatch for McpServerStatus {
    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }

    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn clear_timestamps(&mut self) {
        clear_condition_timestamps(&mut self.conditions);
    }
}
