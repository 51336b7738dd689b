//! Controller runner - builds controller and delete-watcher futures
//!
//! Each `build_*` function returns a Vec of boxed futures that the binary
//! composes. Nothing here starts running until the futures are polled.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::reflector::{self, reflector};
use kube::runtime::watcher::{self, Config as WatcherConfig, Event};
use kube::runtime::{predicates, Controller, WatchStreamExt};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;

use mcp_common::crd::{McpPrompt, McpResource, McpServer, McpTool};
use mcp_controller::{error_policy, prompt, resource, server, tool, Context};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// so the API server closes idle watches before the client times out.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Boxed future driving one controller or watcher
pub type RunnerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

/// Api scoped to one namespace, or cluster-wide when none is given
fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Cached watch stream that drops events which leave `metadata.generation`
/// unchanged, so a controller's own status writes do not re-enqueue it.
fn generation_filtered<K>(
    api: Api<K>,
) -> (
    reflector::Store<K>,
    impl Stream<Item = Result<K, watcher::Error>>,
)
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    let (reader, writer) = reflector::store();
    let stream = reflector(writer, watcher::watcher(api, watcher_config()))
        .default_backoff()
        .applied_objects()
        .predicate_filter(predicates::generation);
    (reader, stream)
}

/// Build the four reconcile controllers
///
/// The MCPServer controller also owns its gateway Deployments so pod
/// readiness changes feed straight back into server status. It takes no
/// generation filter: child kinds enqueue it through an annotation touch.
pub fn build_controllers(
    client: Client,
    ctx: Arc<Context>,
    namespace: Option<&str>,
) -> Vec<RunnerFuture> {
    let servers: Api<McpServer> = scoped_api(&client, namespace);
    let deployments: Api<Deployment> = scoped_api(&client, namespace);
    let tools: Api<McpTool> = scoped_api(&client, namespace);
    let prompts: Api<McpPrompt> = scoped_api(&client, namespace);
    let resources: Api<McpResource> = scoped_api(&client, namespace);

    let server_ctrl = Controller::new(servers, watcher_config())
        .owns(deployments, watcher_config())
        .shutdown_on_signal()
        .run(server::reconcile, error_policy::<McpServer>, ctx.clone())
        .for_each(log_reconcile_result("MCPServer"));

    let (tools_store, tools_stream) = generation_filtered(tools);
    let tool_ctrl = Controller::for_stream(tools_stream, tools_store)
        .shutdown_on_signal()
        .run(tool::reconcile, error_policy::<McpTool>, ctx.clone())
        .for_each(log_reconcile_result("MCPTool"));

    let (prompts_store, prompts_stream) = generation_filtered(prompts);
    let prompt_ctrl = Controller::for_stream(prompts_stream, prompts_store)
        .shutdown_on_signal()
        .run(prompt::reconcile, error_policy::<McpPrompt>, ctx.clone())
        .for_each(log_reconcile_result("MCPPrompt"));

    let (resources_store, resources_stream) = generation_filtered(resources);
    let resource_ctrl = Controller::for_stream(resources_stream, resources_store)
        .shutdown_on_signal()
        .run(resource::reconcile, error_policy::<McpResource>, ctx)
        .for_each(log_reconcile_result("MCPResource"));

    tracing::info!("- MCPServer controller");
    tracing::info!("- MCPTool controller");
    tracing::info!("- MCPPrompt controller");
    tracing::info!("- MCPResource controller");

    vec![
        Box::pin(server_ctrl),
        Box::pin(tool_ctrl),
        Box::pin(prompt_ctrl),
        Box::pin(resource_ctrl),
    ]
}

/// Objects removed while the watch is live
///
/// Deletions that happen while the operator is down are not replayed; the
/// periodic MCPServer resync rebuilds the aggregation instead.
fn deletions<K>(api: Api<K>, kind: &'static str) -> impl Stream<Item = K> + Send
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
{
    watcher::watcher(api, watcher_config())
        .default_backoff()
        .filter_map(move |event| async move {
            match event {
                Ok(Event::Delete(obj)) => Some(obj),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, kind, "delete watcher error");
                    None
                }
            }
        })
}

/// Build one delete watcher per kind, each invoking that kind's delete handler
pub fn build_delete_watchers(
    client: Client,
    ctx: Arc<Context>,
    namespace: Option<&str>,
) -> Vec<RunnerFuture> {
    let server_ctx = ctx.clone();
    let servers = deletions(scoped_api::<McpServer>(&client, namespace), "MCPServer")
        .for_each(move |obj| {
            let ctx = server_ctx.clone();
            async move { server::on_delete(&obj, &ctx).await }
        });

    let tool_ctx = ctx.clone();
    let tools = deletions(scoped_api::<McpTool>(&client, namespace), "MCPTool").for_each(
        move |obj| {
            let ctx = tool_ctx.clone();
            async move { tool::on_delete(&obj, &ctx).await }
        },
    );

    let prompt_ctx = ctx.clone();
    let prompts = deletions(scoped_api::<McpPrompt>(&client, namespace), "MCPPrompt")
        .for_each(move |obj| {
            let ctx = prompt_ctx.clone();
            async move { prompt::on_delete(&obj, &ctx).await }
        });

    let resources = deletions(scoped_api::<McpResource>(&client, namespace), "MCPResource")
        .for_each(move |obj| {
            let ctx = ctx.clone();
            async move { resource::on_delete(&obj, &ctx).await }
        });

    vec![
        Box::pin(servers),
        Box::pin(tools),
        Box::pin(prompts),
        Box::pin(resources),
    ]
}

/// Creates a closure for logging reconciliation results.
fn log_reconcile_result<T: Debug, E: Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
