//! MCPResource reconciler
//!
//! Inline content takes precedence over operations: when both are present,
//! only the content is evaluated and no Service lookups happen.

use std::sync::Arc;

use chrono::Utc;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{info, instrument, warn};

use mcp_common::crd::{McpResource, McpResourceSpec, McpResourceStatus};
use mcp_common::metrics::ControllerKind;
use mcp_common::status::StatusPatch;
use mcp_common::Error;

use crate::kube_client::McpKubeClient;
use crate::trigger::notify_servers;
use crate::{namespace_of, timed, validate_spec, Context, READY_CONDITION};

/// Neither operations nor content is set
pub const REASON_INVALID_SPEC: &str = "InvalidSpec";
/// Inline content has no text or blob
pub const REASON_EMPTY_CONTENT: &str = "EmptyContent";
/// Inline content is servable
pub const REASON_CONTENT_VALID: &str = "ContentValid";
/// An operation's Service does not exist
pub const REASON_SERVICE_NOT_FOUND: &str = "ServiceNotFound";
/// Every operation's Service exists
pub const REASON_OPERATIONS_VALID: &str = "OperationsValid";

/// Compute MCPResource status, looking up operation Services as needed
pub async fn compute_status(
    kube: &dyn McpKubeClient,
    spec: &McpResourceSpec,
    namespace: &str,
) -> Result<McpResourceStatus, Error> {
    let status = McpResourceStatus {
        last_sync_time: Some(Utc::now()),
        ..Default::default()
    };

    if let Some(content) = &spec.content {
        if !content.has_data() {
            warn!("inline content is empty");
            return Ok(status.with_condition(
                READY_CONDITION,
                false,
                REASON_EMPTY_CONTENT,
                "Inline content is empty (no text or blob data)",
            ));
        }
        return Ok(McpResourceStatus {
            ready: true,
            ..status
        }
        .with_condition(
            READY_CONDITION,
            true,
            REASON_CONTENT_VALID,
            "Inline content validated successfully",
        ));
    }

    let Some(operations) = spec.operations.as_deref().filter(|ops| !ops.is_empty()) else {
        warn!("resource has neither operations nor content");
        return Ok(status.with_condition(
            READY_CONDITION,
            false,
            REASON_INVALID_SPEC,
            "Resource must have either operations or content defined",
        ));
    };

    let operation_count = i32::try_from(operations.len()).unwrap_or(i32::MAX);
    let status = McpResourceStatus {
        operation_count,
        ..status
    };

    for operation in operations {
        let service = &operation.service;
        let service_namespace = service.resolve_namespace(namespace);
        if kube
            .get_service(&service.name, service_namespace)
            .await?
            .is_none()
        {
            info!(service = %service.name, %service_namespace, "operation service not found");
            return Ok(status.with_condition(
                READY_CONDITION,
                false,
                REASON_SERVICE_NOT_FOUND,
                format!(
                    "Service {} not found in namespace {service_namespace}",
                    service.name
                ),
            ));
        }
    }

    Ok(McpResourceStatus {
        ready: true,
        ..status
    }
    .with_condition(
        READY_CONDITION,
        true,
        REASON_OPERATIONS_VALID,
        format!("All {operation_count} operation(s) validated successfully"),
    ))
}

/// Reconcile an MCPResource
#[instrument(skip(resource, ctx), fields(resource = %resource.name_any()))]
pub async fn reconcile(resource: Arc<McpResource>, ctx: Arc<Context>) -> Result<Action, Error> {
    timed(ControllerKind::Resource, reconcile_resource(&resource, &ctx)).await
}

async fn reconcile_resource(resource: &McpResource, ctx: &Context) -> Result<Action, Error> {
    let name = resource.name_any();
    let namespace = namespace_of(resource)?;
    info!(%namespace, "reconciling MCPResource");

    validate_spec(&name, &resource.spec)?;

    let status = compute_status(ctx.kube.as_ref(), &resource.spec, &namespace).await?;
    let ready = status.ready;
    // Timestamps are refreshed on every pass
    ctx.kube
        .patch_resource_status(&name, &namespace, &status)
        .await?;

    notify_servers(ctx.kube.as_ref(), &namespace).await;

    if ready {
        Ok(Action::await_change())
    } else {
        Ok(Action::requeue(ctx.resync_interval))
    }
}

/// Handle MCPResource deletion by nudging every MCPServer in its namespace
pub async fn on_delete(resource: &McpResource, ctx: &Context) {
    let Some(namespace) = resource.namespace() else {
        return;
    };
    info!(resource = %resource.name_any(), %namespace, "MCPResource deleted");
    notify_servers(ctx.kube.as_ref(), &namespace).await;
}
