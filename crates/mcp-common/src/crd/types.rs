//! Supporting types shared by the MCP custom resources

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Paths must be absolute
static ABSOLUTE_PATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/.*$").expect("absolute path regex is valid"));

/// Identifier used for prompt variables and operation parameters
static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("identifier regex is valid"));

/// Validate that a path starts with `/`
pub(crate) fn validate_absolute_path(path: &str) -> Result<(), ValidationError> {
    if ABSOLUTE_PATH_REGEX.is_match(path) {
        Ok(())
    } else {
        let mut err = ValidationError::new("absolute_path");
        err.message = Some(format!("path '{path}' must start with '/'").into());
        Err(err)
    }
}

/// Validate a template variable or parameter identifier
pub(crate) fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    if IDENTIFIER_REGEX.is_match(name) {
        Ok(())
    } else {
        let mut err = ValidationError::new("identifier");
        err.message =
            Some(format!("'{name}' may only contain letters, digits and underscores").into());
        Err(err)
    }
}

/// Schema for free-form JSON objects (tool input schemas, prompt defaults)
pub(crate) fn preserve_unknown_object(
    _: &mut schemars::gen::SchemaGenerator,
) -> schemars::schema::Schema {
    use schemars::schema::{InstanceType, SchemaObject};

    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    schema.into()
}

// ============================================================================
// Conditions
// ============================================================================

/// Status of a condition
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(ok: bool) -> Self {
        if ok {
            Self::True
        } else {
            Self::False
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Condition representing one observable facet of a resource's health
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., "Ready", "Validated")
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Last time the condition transitioned, serialized in UTC with a `Z` suffix
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition stamped with the current time
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// Returns true when the condition status is `True`
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

// ============================================================================
// Service references
// ============================================================================

fn default_service_path() -> String {
    "/".to_string()
}

/// Reference to a plain Kubernetes Service backing a tool or operation
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReference {
    /// Service name
    #[validate(length(min = 1, max = 253, message = "service name must be 1-253 characters"))]
    pub name: String,

    /// Service namespace, defaulting to the referencing object's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 63, message = "service namespace must be 1-63 characters"))]
    pub namespace: Option<String>,

    /// Service port
    #[validate(range(min = 1, max = 65535, message = "port must be between 1 and 65535"))]
    pub port: i32,

    /// Base path appended to the service endpoint
    #[serde(default = "default_service_path")]
    #[validate(custom(function = "validate_absolute_path"))]
    pub path: String,
}

impl ServiceReference {
    /// Namespace to resolve the service in
    pub fn resolve_namespace<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }
}

// ============================================================================
// Label selectors
// ============================================================================

/// Operator for label selector requirements
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum LabelSelectorOperator {
    /// Label value must be in the set
    In,
    /// Label value must not be in the set
    NotIn,
    /// Label key must exist
    Exists,
    /// Label key must not exist
    DoesNotExist,
}

/// A single label selector requirement
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelectorRequirement {
    /// Label key
    pub key: String,

    /// Operator applied to the key and values
    pub operator: LabelSelectorOperator,

    /// Values for In/NotIn (ignored for Exists/DoesNotExist)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl LabelSelectorRequirement {
    /// Render this requirement in Kubernetes selector syntax
    pub fn to_query_fragment(&self) -> String {
        match self.operator {
            LabelSelectorOperator::In => format!("{} in ({})", self.key, self.values.join(",")),
            LabelSelectorOperator::NotIn => {
                format!("{} notin ({})", self.key, self.values.join(","))
            }
            LabelSelectorOperator::Exists => self.key.clone(),
            LabelSelectorOperator::DoesNotExist => format!("!{}", self.key),
        }
    }
}

/// Label selector used to discover tools, prompts and resources
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Exact label matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,

    /// Set-based requirements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

impl LabelSelector {
    /// Render the selector as a Kubernetes label selector query string
    ///
    /// All fragments are ANDed with commas. An empty selector renders as an
    /// empty string, which matches every object.
    pub fn to_query_string(&self) -> String {
        let labels = self
            .match_labels
            .iter()
            .flatten()
            .map(|(k, v)| format!("{k}={v}"));
        let expressions = self
            .match_expressions
            .iter()
            .map(LabelSelectorRequirement::to_query_fragment);
        labels.chain(expressions).collect::<Vec<_>>().join(",")
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// HTTP method used to invoke a tool or resource operation
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    #[default]
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
        }
    }
}
