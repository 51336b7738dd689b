//! Integration tests for the aggregation flow
//!
//! These tests tell the story of a platform team publishing tools, prompts
//! and resources and watching them appear in a gateway's configuration.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, PostParams};

use mcp_common::crd::{
    InlineContent, McpPrompt, McpPromptSpec, McpResource, McpResourceSpec, McpServer, McpTool,
    PromptVariable,
};

use super::helpers::{
    backing_service, child_meta, cleanup_namespace, config_document, config_entry_names,
    create_namespace, ensure_test_cluster, sample_server, sample_tool, start_operator, wait_until,
    CONVERGE_TIMEOUT,
};

/// Story: a tool, a prompt and a resource land in the gateway ConfigMap
///
/// A team creates a backing Service, an MCPTool pointing at it, a prompt and
/// an inline resource, then an MCPServer selecting all three.
///
/// Expected behavior:
/// - The tool reports Ready with a cluster-DNS endpoint
/// - The ConfigMap carries one entry per child
/// - The gateway Deployment and Service exist and are owned by the server
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_children_are_aggregated_into_gateway_config() {
    let client = ensure_test_cluster().await.expect("failed to setup cluster");
    let ns = "mcp-it-e2e";
    create_namespace(&client, ns).await;
    start_operator(client.clone(), ns);

    let services: Api<Service> = Api::namespaced(client.clone(), ns);
    services
        .create(&PostParams::default(), &backing_service("echo", ns))
        .await
        .expect("failed to create backing service");

    let tools: Api<McpTool> = Api::namespaced(client.clone(), ns);
    tools
        .create(&PostParams::default(), &sample_tool("echo", ns, "echo"))
        .await
        .expect("failed to create tool");

    let prompts: Api<McpPrompt> = Api::namespaced(client.clone(), ns);
    let prompt = McpPrompt {
        metadata: child_meta("greet", ns),
        spec: McpPromptSpec {
            name: "greet".to_string(),
            description: None,
            template: "Hello {{who}}".to_string(),
            variables: vec![PromptVariable {
                name: "who".to_string(),
                description: None,
                required: true,
                default: None,
            }],
            ingress_path: None,
        },
        status: None,
    };
    prompts
        .create(&PostParams::default(), &prompt)
        .await
        .expect("failed to create prompt");

    let resources: Api<McpResource> = Api::namespaced(client.clone(), ns);
    let resource = McpResource {
        metadata: child_meta("readme", ns),
        spec: McpResourceSpec {
            name: "readme".to_string(),
            description: None,
            operations: None,
            content: Some(InlineContent {
                uri: "docs://readme".to_string(),
                mime_type: "text/markdown".to_string(),
                text: Some("# Hello".to_string()),
                blob: None,
            }),
        },
        status: None,
    };
    resources
        .create(&PostParams::default(), &resource)
        .await
        .expect("failed to create resource");

    let servers: Api<McpServer> = Api::namespaced(client.clone(), ns);
    servers
        .create(&PostParams::default(), &sample_server("gw", ns))
        .await
        .expect("failed to create server");

    let tool_ready = wait_until(CONVERGE_TIMEOUT, || async {
        tools
            .get("echo")
            .await
            .ok()
            .and_then(|t| t.status)
            .map_or(false, |s| s.ready)
    })
    .await;
    assert!(tool_ready, "tool never became Ready");

    let endpoint = tools
        .get("echo")
        .await
        .expect("tool should exist")
        .status
        .and_then(|s| s.resolved_endpoint);
    assert_eq!(
        endpoint.as_deref(),
        Some("http://echo.mcp-it-e2e.svc.cluster.local:8080/echo")
    );

    let aggregated = wait_until(CONVERGE_TIMEOUT, || async {
        config_entry_names(&client, ns, "gw", "tools.json").await == vec!["echo".to_string()]
            && config_entry_names(&client, ns, "gw", "prompts.json").await
                == vec!["greet".to_string()]
            && config_entry_names(&client, ns, "gw", "resources.json").await
                == vec!["readme".to_string()]
    })
    .await;
    assert!(aggregated, "ConfigMap never carried all three children");

    let tools_doc = config_document(&client, ns, "gw", "tools.json")
        .await
        .expect("tools.json should parse");
    assert_eq!(
        tools_doc[0]["endpoint"],
        "http://echo.mcp-it-e2e.svc.cluster.local:8080/echo"
    );

    let deployments: Api<Deployment> = Api::namespaced(client.clone(), ns);
    let deployment = deployments
        .get("mcp-server-gw")
        .await
        .expect("gateway deployment should exist");
    let owner = &deployment.metadata.owner_references.expect("owner references")[0];
    assert_eq!(owner.kind, "MCPServer");
    assert_eq!(owner.name, "gw");

    services
        .get("mcp-server-gw")
        .await
        .expect("gateway service should exist");

    let counted = wait_until(CONVERGE_TIMEOUT, || async {
        servers
            .get("gw")
            .await
            .ok()
            .and_then(|s| s.status)
            .map_or(false, |s| {
                s.tool_count == 1 && s.prompt_count == 1 && s.resource_count == 1
            })
    })
    .await;
    assert!(counted, "server status never reported the aggregated counts");

    cleanup_namespace(&client, ns).await;
}

/// Story: a tool whose Service appears later is picked up without edits
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_late_service_is_resolved_on_resync() {
    let client = ensure_test_cluster().await.expect("failed to setup cluster");
    let ns = "mcp-it-late";
    create_namespace(&client, ns).await;
    start_operator(client.clone(), ns);

    let tools: Api<McpTool> = Api::namespaced(client.clone(), ns);
    tools
        .create(&PostParams::default(), &sample_tool("late", ns, "late-svc"))
        .await
        .expect("failed to create tool");

    let not_ready = wait_until(CONVERGE_TIMEOUT, || async {
        tools
            .get("late")
            .await
            .ok()
            .and_then(|t| t.status)
            .map_or(false, |s| !s.ready)
    })
    .await;
    assert!(not_ready, "tool should first report NotReady");

    let services: Api<Service> = Api::namespaced(client.clone(), ns);
    services
        .create(&PostParams::default(), &backing_service("late-svc", ns))
        .await
        .expect("failed to create backing service");

    let ready = wait_until(CONVERGE_TIMEOUT, || async {
        tools
            .get("late")
            .await
            .ok()
            .and_then(|t| t.status)
            .map_or(false, |s| s.ready)
    })
    .await;
    assert!(ready, "tool never resolved its late Service");

    cleanup_namespace(&client, ns).await;
}
