//! Reconcilers for the MCP custom resources
//!
//! Each kind has its own `reconcile` entry point driven by a
//! `kube::runtime::Controller`. Tool, prompt and resource reconcilers fan out
//! to every MCPServer in their namespace through [`trigger::notify_servers`]
//! so the aggregated gateway configuration converges after any change.

pub mod context;
pub mod endpoint;
pub mod kube_client;
pub mod prompt;
pub mod resource;
pub mod resources;
pub mod server;
pub mod tool;
pub mod trigger;

use std::future::Future;
use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use tracing::error;
use validator::Validate;

use mcp_common::metrics::{ControllerKind, ReconcileTimer};
use mcp_common::Error;

pub use context::Context;
pub use kube_client::{McpKubeClient, McpKubeClientImpl};

/// Condition type reported by tool, resource and server reconcilers
pub const READY_CONDITION: &str = "Ready";

/// Condition type reported by the prompt reconciler
pub const VALIDATED_CONDITION: &str = "Validated";

/// Shared error policy for all four controllers
///
/// Transient failures are retried after [`context::RETRY_INTERVAL`]; anything
/// that needs a spec change waits for the next change event.
pub fn error_policy<K>(obj: Arc<K>, error: &Error, _ctx: Arc<Context>) -> Action
where
    K: Resource,
    K::DynamicType: Default,
{
    let namespace = obj.namespace().unwrap_or_default();
    error!(
        ?error,
        kind = %K::kind(&Default::default()),
        name = %obj.name_any(),
        %namespace,
        error_kind = error.kind_label(),
        retryable = error.is_retryable(),
        "reconciliation failed"
    );

    if error.is_retryable() {
        Action::requeue(context::RETRY_INTERVAL)
    } else {
        Action::await_change()
    }
}

/// Run a reconcile body and record its outcome
pub(crate) async fn timed<F>(kind: ControllerKind, fut: F) -> Result<Action, Error>
where
    F: Future<Output = Result<Action, Error>>,
{
    let timer = ReconcileTimer::start(kind);
    let result = fut.await;
    match &result {
        Ok(_) => timer.success(),
        Err(_) => timer.error(),
    }
    result
}

/// Namespace of a namespaced custom resource
pub(crate) fn namespace_of<K: Resource>(obj: &K) -> Result<String, Error> {
    obj.namespace().ok_or_else(|| {
        Error::validation_for_field(obj.name_any(), "metadata.namespace", "object has no namespace")
    })
}

/// Validate a spec, attaching the object name to any failure
pub(crate) fn validate_spec(name: &str, spec: &impl Validate) -> Result<(), Error> {
    spec.validate()
        .map_err(|errors| Error::from_validation_errors(name, &errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube_client::MockMcpKubeClient;
    use mcp_common::crd::{HttpMethod, McpTool, McpToolSpec, ServiceReference};

    fn tool() -> Arc<McpTool> {
        let spec = McpToolSpec {
            name: Some("echo".to_string()),
            description: None,
            tools: None,
            service: ServiceReference {
                name: "echo".to_string(),
                namespace: None,
                port: 80,
                path: "/".to_string(),
            },
            input_schema: None,
            method: HttpMethod::Get,
            ingress_path: None,
        };
        let mut tool = McpTool::new("echo", spec);
        tool.metadata.namespace = Some("tools".to_string());
        Arc::new(tool)
    }

    fn api_error(code: u16) -> Error {
        Error::from(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: "Test".to_string(),
            code,
        }))
    }

    /// Story: throttled and conflicting writes come back after the retry interval
    #[test]
    fn story_transient_api_errors_requeue() {
        let ctx = Arc::new(Context::for_testing(Arc::new(MockMcpKubeClient::new())));
        for code in [409, 429, 500] {
            assert_eq!(
                error_policy(tool(), &api_error(code), ctx.clone()),
                Action::requeue(context::RETRY_INTERVAL),
                "HTTP {code}"
            );
        }
    }

    /// Story: errors that need a spec change wait for one
    #[test]
    fn story_permanent_errors_await_change() {
        let ctx = Arc::new(Context::for_testing(Arc::new(MockMcpKubeClient::new())));
        assert_eq!(error_policy(tool(), &api_error(403), ctx.clone()), Action::await_change());

        let invalid = Error::validation_for_field("echo", "spec.service", "missing");
        assert_eq!(error_policy(tool(), &invalid, ctx), Action::await_change());
    }
}
