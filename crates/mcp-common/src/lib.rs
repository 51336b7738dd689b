//! Common types for the MCP operator: CRDs, errors, status helpers and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod metrics;
pub mod status;
pub mod telemetry;

pub use error::Error;

/// API group shared by all MCP custom resources
pub const API_GROUP: &str = "mcp.k8s.turd.ninja";

/// API version served for all MCP custom resources
pub const API_VERSION: &str = "v1alpha1";

/// Annotation touched on MCPServers to force re-aggregation after a dependency changes
pub const LAST_CHILD_UPDATE_ANNOTATION: &str = "mcp.k8s.turd.ninja/last-child-update";

/// Label carrying the owning MCPServer name on generated objects
pub const SERVER_LABEL_KEY: &str = "mcp.k8s.turd.ninja/server";

/// Standard `app.kubernetes.io/name` label key
pub const APP_NAME_LABEL_KEY: &str = "app.kubernetes.io/name";

/// Standard `app.kubernetes.io/instance` label key
pub const APP_INSTANCE_LABEL_KEY: &str = "app.kubernetes.io/instance";

/// Value of `app.kubernetes.io/name` on every generated gateway object
pub const APP_NAME: &str = "mcp-server";

/// Field manager used for server-side apply and status patches
pub const FIELD_MANAGER: &str = "mcp-operator";
