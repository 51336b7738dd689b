//! Cluster-DNS endpoint resolution for backend Services

use once_cell::sync::Lazy;
use regex::Regex;

use mcp_common::Error;

use crate::kube_client::McpKubeClient;

static SLASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/{2,}").expect("slash regex is valid"));

/// Cluster-DNS URL of a Service port
///
/// Deterministic; the port is not checked against the Service spec.
pub fn service_endpoint(name: &str, namespace: &str, port: i32) -> String {
    format!("http://{name}.{namespace}.svc.cluster.local:{port}")
}

/// Resolve a Service to its cluster-DNS URL, `None` if the Service is absent
pub async fn resolve_service_endpoint(
    kube: &dyn McpKubeClient,
    name: &str,
    namespace: &str,
    port: i32,
) -> Result<Option<String>, Error> {
    Ok(kube
        .get_service(name, namespace)
        .await?
        .map(|_| service_endpoint(name, namespace, port)))
}

/// Collapse runs of `/` into one, leaving the first `://` intact
pub fn collapse_slashes(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => format!("{scheme}://{}", SLASH_RUN.replace_all(rest, "/")),
        None => SLASH_RUN.replace_all(url, "/").into_owned(),
    }
}

/// Append a path to a base endpoint and normalize slashes
pub fn join_path(base: &str, path: &str) -> String {
    collapse_slashes(&format!("{base}{path}"))
}
