//! Cross-resource fan-out
//!
//! When a tool, prompt or resource changes, every MCPServer in the same
//! namespace gets its `last-child-update` annotation touched. The resulting
//! update event makes the server controller re-run aggregation.

use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use kube::ResourceExt;
use mcp_common::metrics::record_trigger_failure;
use mcp_common::LAST_CHILD_UPDATE_ANNOTATION;

use crate::kube_client::McpKubeClient;

/// Touch every MCPServer in `namespace`, returning how many were annotated
///
/// Best effort: failures are logged and skipped, never returned.
pub async fn notify_servers(kube: &dyn McpKubeClient, namespace: &str) -> usize {
    let servers = match kube.list_servers(namespace).await {
        Ok(servers) => servers,
        Err(e) => {
            warn!(%namespace, error = %e, "failed to list MCPServers for fan-out");
            record_trigger_failure(namespace);
            return 0;
        }
    };

    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let mut notified = 0;
    for server in &servers {
        let name = server.name_any();
        match kube
            .annotate_server(&name, namespace, LAST_CHILD_UPDATE_ANNOTATION, &stamp)
            .await
        {
            Ok(()) => notified += 1,
            Err(e) => {
                warn!(server = %name, %namespace, error = %e, "failed to annotate MCPServer");
                record_trigger_failure(namespace);
            }
        }
    }

    debug!(%namespace, notified, total = servers.len(), "notified MCPServers");
    notified
}
