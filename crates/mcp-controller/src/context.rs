//! Shared state handed to every reconcile invocation

use std::sync::Arc;
use std::time::Duration;

use kube::Client;

use crate::kube_client::{McpKubeClient, McpKubeClientImpl};

/// Default interval between periodic MCPServer re-reconciles
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Delay before retrying a reconcile that failed with a transient error
pub const RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Controller context shared by the four MCP reconcilers
///
/// Built once at startup and shared behind an `Arc`; holds no mutable state.
pub struct Context {
    /// Kubernetes client for API operations
    pub kube: Arc<dyn McpKubeClient>,
    /// How often a healthy MCPServer is re-reconciled without an event
    pub resync_interval: Duration,
}

impl Context {
    /// Create a new Context with the given client
    pub fn new(kube: Arc<dyn McpKubeClient>, resync_interval: Duration) -> Self {
        Self {
            kube,
            resync_interval,
        }
    }

    /// Create a new Context backed by a real Kubernetes client
    pub fn from_client(client: Client, resync_interval: Duration) -> Self {
        Self::new(Arc::new(McpKubeClientImpl::new(client)), resync_interval)
    }

    /// Create a context for testing with a mock client
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn McpKubeClient>) -> Self {
        Self::new(kube, DEFAULT_RESYNC_INTERVAL)
    }
}
