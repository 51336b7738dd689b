//! Test helpers for integration tests
//!
//! Provides utilities for managing the kind cluster, test namespaces and an
//! in-process operator.

use std::collections::BTreeMap;
use std::future::Future;
use std::process::Command;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Service, ServicePort, ServiceSpec};
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams};
use kube::{Client, Config};
use tokio::sync::OnceCell;
use tokio::time::{sleep, Instant};

use mcp_common::crd::{
    HttpMethod, LabelSelector, McpServer, McpServerSpec, McpTool, McpToolSpec, RedisConfig,
    ServiceReference, DEFAULT_SERVER_IMAGE,
};
use mcp_controller::Context;
use mcp_operator::controller_runner::{build_controllers, build_delete_watchers};
use mcp_operator::startup::ensure_crds_installed;

/// Name of the kind cluster used for integration tests
pub const TEST_CLUSTER_NAME: &str = "mcp-integration-test";

/// Label every fixture child carries so the test server selects it
pub const SELECTOR_LABEL: (&str, &str) = ("mcp.example.com/suite", "integration");

/// How long to wait for the operator to converge
pub const CONVERGE_TIMEOUT: Duration = Duration::from_secs(90);

/// Global lock to ensure cluster is created only once
static CLUSTER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Track if CRDs have been installed (async-safe)
static CRDS_INSTALLED: OnceCell<Result<(), String>> = OnceCell::const_new();

/// Check if a kind cluster with the given name exists
pub fn kind_cluster_exists(name: &str) -> bool {
    let output = Command::new("kind")
        .args(["get", "clusters"])
        .output()
        .expect("failed to run kind");

    let clusters = String::from_utf8_lossy(&output.stdout);
    clusters.lines().any(|line| line.trim() == name)
}

/// Create a kind cluster for testing
pub fn create_kind_cluster(name: &str) -> Result<(), String> {
    if kind_cluster_exists(name) {
        println!("Kind cluster '{name}' already exists, reusing it");
        return Ok(());
    }

    println!("Creating kind cluster '{name}'...");
    let output = Command::new("kind")
        .args(["create", "cluster", "--name", name, "--wait", "60s"])
        .output()
        .map_err(|e| format!("failed to run kind: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "failed to create kind cluster: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    Ok(())
}

/// Create a Kubernetes client connected to the test cluster
pub async fn create_test_client() -> Result<Client, String> {
    let context_name = format!("kind-{TEST_CLUSTER_NAME}");

    let config = Config::from_kubeconfig(&kube::config::KubeConfigOptions {
        context: Some(context_name),
        ..Default::default()
    })
    .await
    .map_err(|e| format!("failed to load kubeconfig: {e}"))?;

    Client::try_from(config).map_err(|e| format!("failed to create client: {e}"))
}

/// Ensure the test cluster is ready with CRDs installed
///
/// Returns a fresh Client for each call.
pub async fn ensure_test_cluster() -> Result<Client, String> {
    CLUSTER_INIT
        .get_or_init(|| create_kind_cluster(TEST_CLUSTER_NAME))
        .clone()?;

    let client = create_test_client().await?;

    CRDS_INSTALLED
        .get_or_init(|| async {
            let client = create_test_client().await?;
            ensure_crds_installed(&client)
                .await
                .map_err(|e| format!("failed to install CRDs: {e}"))?;
            // Wait for the CRDs to be established
            sleep(Duration::from_secs(2)).await;
            Ok::<(), String>(())
        })
        .await
        .clone()?;

    Ok(client)
}

/// Create a fresh namespace for one test
pub async fn create_namespace(client: &Client, name: &str) {
    let api: Api<Namespace> = Api::all(client.clone());
    let _ = api.delete(name, &DeleteParams::default()).await;
    wait_until(CONVERGE_TIMEOUT, || async {
        api.get_opt(name).await.ok().flatten().is_none()
    })
    .await;

    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    api.create(&PostParams::default(), &ns)
        .await
        .expect("failed to create namespace");
}

/// Delete a test namespace and everything in it
pub async fn cleanup_namespace(client: &Client, name: &str) {
    let api: Api<Namespace> = Api::all(client.clone());
    let _ = api.delete(name, &DeleteParams::default()).await;
}

/// Run the operator in-process, watching only `namespace`
///
/// The spawned tasks end with the test's runtime.
pub fn start_operator(client: Client, namespace: &str) {
    let ctx = Arc::new(Context::from_client(
        client.clone(),
        Duration::from_secs(10),
    ));
    let mut futures = build_controllers(client.clone(), ctx.clone(), Some(namespace));
    futures.extend(build_delete_watchers(client, ctx, Some(namespace)));
    for future in futures {
        tokio::spawn(future);
    }
}

/// Poll `check` every second until it holds or `timeout` elapses
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check().await {
            return true;
        }
        sleep(Duration::from_secs(1)).await;
    }
    false
}

/// Parse one JSON document out of the server's ConfigMap
pub async fn config_document(
    client: &Client,
    namespace: &str,
    server: &str,
    key: &str,
) -> Option<serde_json::Value> {
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let cm = api
        .get_opt(&format!("mcp-server-{server}-config"))
        .await
        .ok()
        .flatten()?;
    let raw = cm.data?.get(key)?.clone();
    serde_json::from_str(&raw).ok()
}

/// Names of the entries in one ConfigMap document
pub async fn config_entry_names(
    client: &Client,
    namespace: &str,
    server: &str,
    key: &str,
) -> Vec<String> {
    config_document(client, namespace, server, key)
        .await
        .and_then(|doc| doc.as_array().cloned())
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| entry["name"].as_str().map(str::to_string))
        .collect()
}

fn selector_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(SELECTOR_LABEL.0.to_string(), SELECTOR_LABEL.1.to_string())])
}

/// Metadata for a fixture child that the test server selects
pub fn child_meta(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(selector_labels()),
        ..Default::default()
    }
}

/// A plain ClusterIP Service for a tool to resolve
pub fn backing_service(name: &str, namespace: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(BTreeMap::from([("app".to_string(), name.to_string())])),
            ports: Some(vec![ServicePort {
                port: 8080,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A single-tool MCPTool backed by `service`
pub fn sample_tool(name: &str, namespace: &str, service: &str) -> McpTool {
    McpTool {
        metadata: child_meta(name, namespace),
        spec: McpToolSpec {
            name: Some(name.to_string()),
            description: Some("integration test tool".to_string()),
            tools: None,
            service: ServiceReference {
                name: service.to_string(),
                namespace: None,
                port: 8080,
                path: format!("/{name}"),
            },
            input_schema: Some(serde_json::json!({"type": "object"})),
            method: HttpMethod::Post,
            ingress_path: None,
        },
        status: None,
    }
}

/// An MCPServer selecting every fixture child
pub fn sample_server(name: &str, namespace: &str) -> McpServer {
    McpServer {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: McpServerSpec {
            replicas: 1,
            image: DEFAULT_SERVER_IMAGE.to_string(),
            redis: RedisConfig {
                service_name: "redis".to_string(),
            },
            ingress: None,
            tool_selector: LabelSelector {
                match_labels: Some(selector_labels()),
                match_expressions: vec![],
            },
            config: None,
        },
        status: None,
    }
}
