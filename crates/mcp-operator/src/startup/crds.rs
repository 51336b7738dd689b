//! CRD installation utilities
//!
//! The operator server-side applies its own CRDs on startup so the installed
//! schemas always match the running binary.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use mcp_common::crd::{McpPrompt, McpResource, McpServer, McpTool};
use mcp_common::FIELD_MANAGER;

/// CRD definition with name and resource
struct CrdDef {
    name: String,
    crd: CustomResourceDefinition,
}

impl CrdDef {
    fn of<K: CustomResourceExt>() -> Self {
        Self {
            name: K::crd_name().to_string(),
            crd: K::crd(),
        }
    }
}

fn mcp_crds() -> Vec<CrdDef> {
    vec![
        CrdDef::of::<McpServer>(),
        CrdDef::of::<McpTool>(),
        CrdDef::of::<McpPrompt>(),
        CrdDef::of::<McpResource>(),
    ]
}

/// Render all four CRDs as a multi-document YAML stream
pub fn render_crds() -> anyhow::Result<String> {
    let docs = mcp_crds()
        .into_iter()
        .map(|def| {
            serde_yaml::to_string(&def.crd)
                .map_err(|e| anyhow::anyhow!("failed to serialize {} CRD: {}", def.name, e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(docs.join("---\n"))
}

/// Install or update all MCP CRDs using server-side apply
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    for def in mcp_crds() {
        tracing::info!(crd = %def.name, "installing CRD");
        crds.patch(&def.name, &params, &Patch::Apply(&def.crd))
            .await
            .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", def.name, e))?;
    }

    tracing::info!("MCP CRDs installed/updated");
    Ok(())
}
