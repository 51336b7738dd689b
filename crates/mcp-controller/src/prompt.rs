//! MCPPrompt reconciler
//!
//! Checks that the `{{placeholders}}` in a template and the declared
//! variables are exactly the same set.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument, warn};

use mcp_common::crd::{McpPrompt, McpPromptSpec, McpPromptStatus};
use mcp_common::metrics::ControllerKind;
use mcp_common::status::StatusPatch;
use mcp_common::Error;

use crate::trigger::notify_servers;
use crate::{namespace_of, timed, validate_spec, Context, VALIDATED_CONDITION};

/// Template references variables that are not declared
pub const REASON_UNDECLARED_VARIABLES: &str = "UndeclaredVariables";
/// Declared variables never appear in the template
pub const REASON_UNUSED_VARIABLES: &str = "UnusedVariables";
/// Template and declarations agree
pub const REASON_TEMPLATE_VALID: &str = "TemplateValid";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([a-zA-Z0-9_]+)\}\}").expect("placeholder regex is valid"));

/// Variable names referenced by `{{name}}` placeholders in a template
pub fn template_variables(template: &str) -> BTreeSet<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Compute MCPPrompt status from its spec
pub fn compute_status(spec: &McpPromptSpec) -> McpPromptStatus {
    let used = template_variables(&spec.template);
    let declared: BTreeSet<&str> = spec.variables.iter().map(|v| v.name.as_str()).collect();

    let status = McpPromptStatus {
        last_validation_time: Some(Utc::now()),
        ..Default::default()
    };

    // BTreeSet differences iterate in sorted order
    let undeclared: Vec<&str> = used.difference(&declared).copied().collect();
    if !undeclared.is_empty() {
        let names = undeclared.join(", ");
        warn!(variables = %names, "template uses undeclared variables");
        return status.with_condition(
            VALIDATED_CONDITION,
            false,
            REASON_UNDECLARED_VARIABLES,
            format!("Template uses undeclared variables: {names}"),
        );
    }

    let unused: Vec<&str> = declared.difference(&used).copied().collect();
    if !unused.is_empty() {
        let names = unused.join(", ");
        warn!(variables = %names, "declared variables are not used");
        return status.with_condition(
            VALIDATED_CONDITION,
            false,
            REASON_UNUSED_VARIABLES,
            format!("Declared variables not used in template: {names}"),
        );
    }

    McpPromptStatus {
        validated: true,
        ..status
    }
    .with_condition(
        VALIDATED_CONDITION,
        true,
        REASON_TEMPLATE_VALID,
        "Template and variables validated successfully",
    )
}

/// Reconcile an MCPPrompt
#[instrument(skip(prompt, ctx), fields(prompt = %prompt.name_any()))]
pub async fn reconcile(prompt: Arc<McpPrompt>, ctx: Arc<Context>) -> Result<Action, Error> {
    timed(ControllerKind::Prompt, reconcile_prompt(&prompt, &ctx)).await
}

async fn reconcile_prompt(prompt: &McpPrompt, ctx: &Context) -> Result<Action, Error> {
    let name = prompt.name_any();
    let namespace = namespace_of(prompt)?;
    info!(%namespace, "reconciling MCPPrompt");

    validate_spec(&name, &prompt.spec)?;

    let status = compute_status(&prompt.spec);
    // Timestamps are refreshed on every pass
    ctx.kube
        .patch_prompt_status(&name, &namespace, &status)
        .await?;

    notify_servers(ctx.kube.as_ref(), &namespace).await;
    Ok(Action::await_change())
}

/// Handle MCPPrompt deletion by nudging every MCPServer in its namespace
pub async fn on_delete(prompt: &McpPrompt, ctx: &Context) {
    let Some(namespace) = prompt.namespace() else {
        return;
    };
    info!(prompt = %prompt.name_any(), %namespace, "MCPPrompt deleted");
    notify_servers(ctx.kube.as_ref(), &namespace).await;
}
