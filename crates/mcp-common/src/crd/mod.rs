//! Custom Resource Definitions for the MCP operator

mod prompt;
mod resource;
mod server;
mod tool;
mod types;

pub use prompt::{McpPrompt, McpPromptSpec, McpPromptStatus, PromptVariable};
pub use resource::{
    InlineContent, McpResource, McpResourceSpec, McpResourceStatus, OperationParameter,
    ParameterLocation, ResourceOperation,
};
pub use server::{
    IngressConfig, McpServer, McpServerSpec, McpServerStatus, RedisConfig, ServerConfig,
    DEFAULT_SERVER_IMAGE,
};
pub use tool::{McpTool, McpToolSpec, McpToolStatus, ToolEntry, ToolMode};
pub use types::{
    Condition, ConditionStatus, HttpMethod, LabelSelector, LabelSelectorOperator,
    LabelSelectorRequirement, ServiceReference,
};
