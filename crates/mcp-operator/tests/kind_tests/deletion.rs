//! Integration tests for deletion
//!
//! These tests tell the story of retiring tools and gateways.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::api::{Api, DeleteParams, PostParams};

use mcp_common::crd::{McpServer, McpTool};

use super::helpers::{
    backing_service, cleanup_namespace, config_entry_names, create_namespace,
    ensure_test_cluster, sample_server, sample_tool, start_operator, wait_until, CONVERGE_TIMEOUT,
};

/// Story: deleting a tool removes it from the gateway configuration
///
/// Expected behavior:
/// - Both tools are aggregated first
/// - After one is deleted only the other remains in `tools.json`
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deleted_tool_leaves_the_config_map() {
    let client = ensure_test_cluster().await.expect("failed to setup cluster");
    let ns = "mcp-it-delete-tool";
    create_namespace(&client, ns).await;
    start_operator(client.clone(), ns);

    let services: Api<Service> = Api::namespaced(client.clone(), ns);
    services
        .create(&PostParams::default(), &backing_service("backend", ns))
        .await
        .expect("failed to create backing service");

    let tools: Api<McpTool> = Api::namespaced(client.clone(), ns);
    for name in ["keep", "drop"] {
        tools
            .create(&PostParams::default(), &sample_tool(name, ns, "backend"))
            .await
            .expect("failed to create tool");
    }

    let servers: Api<McpServer> = Api::namespaced(client.clone(), ns);
    servers
        .create(&PostParams::default(), &sample_server("gw", ns))
        .await
        .expect("failed to create server");

    let both = wait_until(CONVERGE_TIMEOUT, || async {
        let mut names = config_entry_names(&client, ns, "gw", "tools.json").await;
        names.sort();
        names == vec!["drop".to_string(), "keep".to_string()]
    })
    .await;
    assert!(both, "both tools should be aggregated");

    tools
        .delete("drop", &DeleteParams::default())
        .await
        .expect("failed to delete tool");

    let one = wait_until(CONVERGE_TIMEOUT, || async {
        config_entry_names(&client, ns, "gw", "tools.json").await == vec!["keep".to_string()]
    })
    .await;
    assert!(one, "deleted tool should leave tools.json");

    cleanup_namespace(&client, ns).await;
}

/// Story: deleting a server garbage-collects its gateway objects
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deleted_server_takes_its_children() {
    let client = ensure_test_cluster().await.expect("failed to setup cluster");
    let ns = "mcp-it-delete-server";
    create_namespace(&client, ns).await;
    start_operator(client.clone(), ns);

    let servers: Api<McpServer> = Api::namespaced(client.clone(), ns);
    servers
        .create(&PostParams::default(), &sample_server("gw", ns))
        .await
        .expect("failed to create server");

    let deployments: Api<Deployment> = Api::namespaced(client.clone(), ns);
    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), ns);
    let created = wait_until(CONVERGE_TIMEOUT, || async {
        deployments.get_opt("mcp-server-gw").await.ok().flatten().is_some()
            && config_maps
                .get_opt("mcp-server-gw-config")
                .await
                .ok()
                .flatten()
                .is_some()
    })
    .await;
    assert!(created, "gateway objects should be created");

    servers
        .delete("gw", &DeleteParams::foreground())
        .await
        .expect("failed to delete server");

    let collected = wait_until(CONVERGE_TIMEOUT, || async {
        deployments.get_opt("mcp-server-gw").await.ok().flatten().is_none()
            && config_maps
                .get_opt("mcp-server-gw-config")
                .await
                .ok()
                .flatten()
                .is_none()
    })
    .await;
    assert!(collected, "owned objects should be garbage-collected");

    cleanup_namespace(&client, ns).await;
}
