//! MCPServer reconciler
//!
//! Every pass rebuilds the full desired state from scratch: list the
//! selected children, aggregate them, write the ConfigMap, Ingress,
//! Deployment and Service, then report Deployment readiness. The pass is
//! idempotent, so the periodic requeue doubles as drift correction.

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

use mcp_common::crd::{McpServer, McpServerStatus};
use mcp_common::metrics::{set_managed_resources, ControllerKind, EntryKind};
use mcp_common::status::{needs_update, StatusPatch};
use mcp_common::Error;

use super::aggregate::{aggregate_prompts, aggregate_resources, aggregate_tools, Aggregation};
use crate::kube_client::McpKubeClient;
use crate::resources::{
    build_config_map, build_deployment, build_ingress, build_service, gateway_name,
};
use crate::{namespace_of, timed, validate_spec, Context, READY_CONDITION};

/// Gateway Deployment has at least one ready replica
pub const REASON_DEPLOYMENT_READY: &str = "DeploymentReady";
/// Gateway Deployment has no ready replicas yet
pub const REASON_DEPLOYMENT_NOT_READY: &str = "DeploymentNotReady";

/// Reconcile an MCPServer
#[instrument(skip(server, ctx), fields(server = %server.name_any()))]
pub async fn reconcile(server: Arc<McpServer>, ctx: Arc<Context>) -> Result<Action, Error> {
    timed(ControllerKind::Server, reconcile_server(&server, &ctx)).await
}

async fn reconcile_server(server: &McpServer, ctx: &Context) -> Result<Action, Error> {
    let name = server.name_any();
    let namespace = namespace_of(server)?;
    info!(%namespace, "reconciling MCPServer");

    validate_spec(&name, &server.spec)?;

    let kube = ctx.kube.as_ref();
    let aggregation = collect(kube, server, &namespace).await;
    info!(
        tools = aggregation.tools.len(),
        prompts = aggregation.prompts.len(),
        resources = aggregation.resources.len(),
        "aggregated server configuration"
    );

    let config_map = build_config_map(server, &namespace, aggregation.documents()?)?;
    kube.create_or_update_config_map(&config_map).await?;

    if let Some(ingress) = &server.spec.ingress {
        kube.create_or_update_ingress(&build_ingress(server, &namespace, ingress)?)
            .await?;
    }

    kube.create_or_update_deployment(&build_deployment(server, &namespace)?)
        .await?;
    kube.create_or_update_service(&build_service(server, &namespace)?)
        .await?;

    let ready_replicas = ready_replicas(kube, &name, &namespace).await?;
    let status = server_status(&aggregation, ready_replicas);

    if needs_update(server.status.as_ref(), &status) {
        kube.patch_server_status(&name, &namespace, &status).await?;
    } else {
        debug!("status unchanged, skipping patch");
    }

    set_managed_resources(&namespace, &name, EntryKind::Tool, aggregation.tools.len());
    set_managed_resources(&namespace, &name, EntryKind::Prompt, aggregation.prompts.len());
    set_managed_resources(&namespace, &name, EntryKind::Resource, aggregation.resources.len());

    // Deployment readiness changes do not always produce an MCPServer event
    Ok(Action::requeue(ctx.resync_interval))
}

/// List and aggregate everything the server's selector matches
async fn collect(kube: &dyn McpKubeClient, server: &McpServer, namespace: &str) -> Aggregation {
    let selector = server.spec.tool_selector.to_query_string();
    debug!(%selector, "listing selected children");

    let tools = kube.list_tools(namespace, &selector).await;
    let prompts = kube.list_prompts(namespace, &selector).await;
    let resources = kube.list_resources(namespace, &selector).await;

    Aggregation {
        tools: aggregate_tools(kube, &tools, namespace).await,
        prompts: aggregate_prompts(&prompts),
        resources: aggregate_resources(&resources),
    }
}

async fn ready_replicas(kube: &dyn McpKubeClient, server: &str, namespace: &str) -> Result<i32, Error> {
    let deployment = kube.get_deployment(&gateway_name(server), namespace).await?;
    Ok(deployment
        .and_then(|d| d.status)
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0))
}

fn server_status(aggregation: &Aggregation, ready_replicas: i32) -> McpServerStatus {
    let ready = ready_replicas > 0;
    let (reason, message) = if ready {
        (
            REASON_DEPLOYMENT_READY,
            format!("Deployment has {ready_replicas} ready replica(s)"),
        )
    } else {
        (
            REASON_DEPLOYMENT_NOT_READY,
            "Deployment has no ready replicas".to_string(),
        )
    };

    McpServerStatus {
        ready_replicas,
        tool_count: saturating_count(aggregation.tools.len()),
        prompt_count: saturating_count(aggregation.prompts.len()),
        resource_count: saturating_count(aggregation.resources.len()),
        ..Default::default()
    }
    .with_condition(READY_CONDITION, ready, reason, message)
}

/// Status counts are `int32` in the CRD schema
fn saturating_count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// Log MCPServer deletion; owned children are garbage-collected
pub async fn on_delete(server: &McpServer, _ctx: &Context) {
    info!(
        server = %server.name_any(),
        namespace = %server.namespace().unwrap_or_default(),
        "MCPServer deleted, owned objects will be garbage-collected"
    );
}
