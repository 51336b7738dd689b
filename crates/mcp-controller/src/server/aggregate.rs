//! Aggregation of tools, prompts and resources into gateway documents
//!
//! The three documents are consumed by the gateway image, so their shapes
//! are a wire contract: tools are `{name, endpoint, inputSchema}`, prompts
//! `{name, template, variables}` and resources `{name, content, operations}`.

use kube::ResourceExt;
use serde::Serialize;
use tracing::{debug, warn};

use mcp_common::crd::{
    InlineContent, McpPrompt, McpResource, McpTool, PromptVariable, ResourceOperation,
    ServiceReference, ToolMode,
};
use mcp_common::Error;

use crate::endpoint::{join_path, resolve_service_endpoint};
use crate::kube_client::McpKubeClient;
use crate::resources::ConfigDocuments;

/// One entry in `tools.json`
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedTool {
    /// Tool name
    pub name: String,
    /// Fully resolved URL of the tool
    pub endpoint: String,
    /// JSON schema of the tool input (`{}` when undeclared)
    pub input_schema: serde_json::Value,
}

/// One entry in `prompts.json`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregatedPrompt {
    /// Prompt name
    pub name: String,
    /// Template text
    pub template: String,
    /// Declared variables
    pub variables: Vec<PromptVariable>,
}

/// One entry in `resources.json`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregatedResource {
    /// Resource name
    pub name: String,
    /// Inline content, if any
    pub content: Option<InlineContent>,
    /// HTTP operations, if any
    pub operations: Option<Vec<ResourceOperation>>,
}

/// Everything an MCPServer serves
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregation {
    /// Resolved tool entries
    pub tools: Vec<AggregatedTool>,
    /// Prompt entries
    pub prompts: Vec<AggregatedPrompt>,
    /// Resource entries
    pub resources: Vec<AggregatedResource>,
}

impl Aggregation {
    /// Serialize the three documents for the gateway ConfigMap
    pub fn documents(&self) -> Result<ConfigDocuments, Error> {
        let encode = |what: &str, value: serde_json::Result<String>| {
            value.map_err(|e| Error::serialization_for_kind("ConfigMap", format!("{what}: {e}")))
        };
        Ok(ConfigDocuments {
            tools: encode("tools.json", serde_json::to_string(&self.tools))?,
            prompts: encode("prompts.json", serde_json::to_string(&self.prompts))?,
            resources: encode("resources.json", serde_json::to_string(&self.resources))?,
        })
    }
}

/// Resolve one endpoint, dropping the entry on any failure
async fn resolve_entry(
    kube: &dyn McpKubeClient,
    service: &ServiceReference,
    namespace: &str,
    path: &str,
) -> Option<String> {
    let service_namespace = service.resolve_namespace(namespace);
    match resolve_service_endpoint(kube, &service.name, service_namespace, service.port).await {
        Ok(Some(base)) => Some(join_path(&base, path)),
        Ok(None) => {
            debug!(service = %service.name, %service_namespace, "service not found, dropping tool entry");
            None
        }
        Err(e) => {
            warn!(service = %service.name, %service_namespace, error = %e, "service lookup failed, dropping tool entry");
            None
        }
    }
}

/// Expand MCPTools into resolved tool entries
///
/// Single-tool objects contribute one entry using `service.path`; multi-tool
/// objects contribute one entry per `tools[]` item using the shared Service
/// with the item's path. Entries that cannot be resolved are left out.
pub async fn aggregate_tools(
    kube: &dyn McpKubeClient,
    tools: &[McpTool],
    namespace: &str,
) -> Vec<AggregatedTool> {
    let mut entries = Vec::new();

    for tool in tools {
        let tool_namespace = tool.namespace().unwrap_or_else(|| namespace.to_string());
        let service = &tool.spec.service;

        match tool.spec.mode() {
            Some(ToolMode::Single(name)) => {
                if let Some(endpoint) =
                    resolve_entry(kube, service, &tool_namespace, &service.path).await
                {
                    entries.push(AggregatedTool {
                        name: name.to_string(),
                        endpoint,
                        input_schema: schema_or_empty(tool.spec.input_schema.as_ref()),
                    });
                }
            }
            Some(ToolMode::Multi(items)) => {
                for item in items {
                    if let Some(endpoint) =
                        resolve_entry(kube, service, &tool_namespace, &item.path).await
                    {
                        entries.push(AggregatedTool {
                            name: item.name.clone(),
                            endpoint,
                            input_schema: schema_or_empty(item.input_schema.as_ref()),
                        });
                    }
                }
            }
            None => {
                debug!(tool = %tool.name_any(), "tool sets neither or both of name and tools, skipping");
            }
        }
    }

    entries
}

fn schema_or_empty(schema: Option<&serde_json::Value>) -> serde_json::Value {
    schema
        .cloned()
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()))
}

/// One prompt entry per MCPPrompt
pub fn aggregate_prompts(prompts: &[McpPrompt]) -> Vec<AggregatedPrompt> {
    prompts
        .iter()
        .map(|p| AggregatedPrompt {
            name: p.spec.name.clone(),
            template: p.spec.template.clone(),
            variables: p.spec.variables.clone(),
        })
        .collect()
}

/// One resource entry per MCPResource, passed through verbatim
pub fn aggregate_resources(resources: &[McpResource]) -> Vec<AggregatedResource> {
    resources
        .iter()
        .map(|r| AggregatedResource {
            name: r.spec.name.clone(),
            content: r.spec.content.clone(),
            operations: r.spec.operations.clone(),
        })
        .collect()
}
