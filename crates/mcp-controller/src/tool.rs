//! MCPTool reconciler
//!
//! Resolves the tool's backing Service to a cluster-DNS endpoint and reports
//! it in status. Single-tool objects get `service.path` appended; multi-tool
//! objects report the bare base endpoint and leave per-tool paths to the
//! server aggregator.

use std::sync::Arc;

use chrono::Utc;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{info, instrument};

use mcp_common::crd::{McpTool, McpToolSpec, McpToolStatus, ToolMode};
use mcp_common::metrics::ControllerKind;
use mcp_common::status::StatusPatch;
use mcp_common::Error;

use crate::endpoint::{join_path, resolve_service_endpoint};
use crate::kube_client::McpKubeClient;
use crate::trigger::notify_servers;
use crate::{namespace_of, timed, validate_spec, Context, READY_CONDITION};

/// Backing Service does not exist
pub const REASON_SERVICE_NOT_FOUND: &str = "ServiceNotFound";
/// Backing Service resolved to an endpoint
pub const REASON_SERVICE_RESOLVED: &str = "ServiceResolved";

/// Reconcile an MCPTool
#[instrument(skip(tool, ctx), fields(tool = %tool.name_any()))]
pub async fn reconcile(tool: Arc<McpTool>, ctx: Arc<Context>) -> Result<Action, Error> {
    timed(ControllerKind::Tool, reconcile_tool(&tool, &ctx)).await
}

async fn reconcile_tool(tool: &McpTool, ctx: &Context) -> Result<Action, Error> {
    let name = tool.name_any();
    let namespace = namespace_of(tool)?;
    info!(%namespace, "reconciling MCPTool");

    validate_spec(&name, &tool.spec)?;

    let status = compute_status(ctx.kube.as_ref(), &tool.spec, &namespace).await?;
    let ready = status.ready;

    // Timestamps are refreshed on every pass
    ctx.kube.patch_tool_status(&name, &namespace, &status).await?;

    if !ready {
        // A Service that shows up later produces no MCPTool event
        return Ok(Action::requeue(ctx.resync_interval));
    }

    notify_servers(ctx.kube.as_ref(), &namespace).await;
    Ok(Action::await_change())
}

/// Compute MCPTool status from the current state of its backing Service
pub async fn compute_status(
    kube: &dyn McpKubeClient,
    spec: &McpToolSpec,
    namespace: &str,
) -> Result<McpToolStatus, Error> {
    let service = &spec.service;
    let service_namespace = service.resolve_namespace(namespace);

    let Some(base) =
        resolve_service_endpoint(kube, &service.name, service_namespace, service.port).await?
    else {
        info!(
            service = %service.name,
            %service_namespace,
            "backing service not found"
        );
        return Ok(McpToolStatus {
            ready: false,
            resolved_endpoint: None,
            ..Default::default()
        }
        .with_condition(
            READY_CONDITION,
            false,
            REASON_SERVICE_NOT_FOUND,
            format!(
                "Service {} not found in namespace {service_namespace}",
                service.name
            ),
        ));
    };

    let endpoint = match spec.mode() {
        Some(ToolMode::Multi(_)) => base,
        _ => join_path(&base, &service.path),
    };
    info!(%endpoint, "resolved tool endpoint");

    Ok(McpToolStatus {
        ready: true,
        resolved_endpoint: Some(endpoint.clone()),
        last_sync_time: Some(Utc::now()),
        ..Default::default()
    }
    .with_condition(
        READY_CONDITION,
        true,
        REASON_SERVICE_RESOLVED,
        format!("Service {} resolved to {endpoint}", service.name),
    ))
}

/// Handle MCPTool deletion by nudging every MCPServer in its namespace
pub async fn on_delete(tool: &McpTool, ctx: &Context) {
    let Some(namespace) = tool.namespace() else {
        return;
    };
    info!(tool = %tool.name_any(), %namespace, "MCPTool deleted");
    notify_servers(ctx.kube.as_ref(), &namespace).await;
}
