//! MCP Operator - reconciles MCPServer, MCPTool, MCPPrompt and MCPResource

use std::sync::Arc;

use clap::Parser;
use futures::future::join_all;
use kube::Client;

use mcp_common::telemetry::{init_telemetry, TelemetryConfig};
use mcp_controller::Context;
use mcp_operator::config::{Cli, Commands};
use mcp_operator::controller_runner::{build_controllers, build_delete_watchers};
use mcp_operator::startup::{ensure_crds_installed, render_crds};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        println!("{}", render_crds()?);
        return Ok(());
    }

    init_telemetry(TelemetryConfig {
        service_name: cli.service_name.clone(),
        ..Default::default()
    })?;

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli).await,
    }
}

async fn run_controller(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("MCP operator starting...");

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if cli.skip_crd_install {
        tracing::info!("Skipping CRD installation");
    } else {
        ensure_crds_installed(&client).await?;
    }

    let namespace = cli.watch_namespace.as_deref();
    match namespace {
        Some(ns) => tracing::info!(namespace = %ns, "Watching a single namespace"),
        None => tracing::info!("Watching all namespaces"),
    }

    let ctx = Arc::new(Context::from_client(client.clone(), cli.resync_interval()));

    tracing::info!("Starting controllers:");
    let controllers = build_controllers(client.clone(), ctx.clone(), namespace);
    let watchers = build_delete_watchers(client, ctx, namespace);

    // Controllers stop on SIGTERM/ctrl-c; watchers run until then
    tokio::select! {
        _ = join_all(controllers) => {
            tracing::info!("Controllers stopped");
        }
        _ = join_all(watchers) => {
            tracing::warn!("Delete watchers stopped unexpectedly");
        }
    }

    tracing::info!("MCP operator shutting down");
    Ok(())
}
