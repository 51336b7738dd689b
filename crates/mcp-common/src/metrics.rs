//! Metrics registry for MCP operator observability
//!
//! Provides OpenTelemetry metrics for:
//! - Reconciliation outcomes and latency per controller
//! - Aggregated entry counts per MCPServer
//! - Cross-resource trigger failures
//!
//! Nothing is exported unless a meter provider is installed by
//! [`crate::telemetry::init_telemetry`]; recording is a no-op otherwise.

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::KeyValue;

/// Global meter for MCP operator metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("mcp-operator"));

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Counter of reconciliation attempts
///
/// Labels:
/// - `controller`: mcpserver, mcptool, mcpprompt, mcpresource
/// - `result`: success, error
pub static RECONCILIATION_TOTAL: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("mcp_reconciliation_total")
        .with_description("Total reconciliation attempts")
        .with_unit("{reconciliations}")
        .build()
});

/// Histogram of reconciliation duration
///
/// Labels:
/// - `controller`: mcpserver, mcptool, mcpprompt, mcpresource
pub static RECONCILIATION_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("mcp_reconciliation_duration_seconds")
        .with_description("Time spent in reconciliation")
        .with_unit("s")
        .with_boundaries(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
        .build()
});

// ============================================================================
// Aggregation Metrics
// ============================================================================

/// Gauge of aggregated entries per server
///
/// Labels:
/// - `kind`: tool, prompt, resource
/// - `server`: `namespace/name` of the MCPServer
pub static MANAGED_RESOURCES: Lazy<Gauge<i64>> = Lazy::new(|| {
    METER
        .i64_gauge("mcp_managed_resources")
        .with_description("Number of managed resources by kind")
        .with_unit("{resources}")
        .build()
});

/// Counter of MCPServers the trigger failed to annotate
///
/// Labels:
/// - `namespace`: namespace of the triggering object
pub static TRIGGER_FAILURES: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("mcp_trigger_failures_total")
        .with_description("Total MCPServer annotation failures during fan-out")
        .with_unit("{failures}")
        .build()
});

// ============================================================================
// Helper Types
// ============================================================================

/// Controller label values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    /// MCPServer reconciler
    Server,
    /// MCPTool reconciler
    Tool,
    /// MCPPrompt reconciler
    Prompt,
    /// MCPResource reconciler
    Resource,
}

impl ControllerKind {
    /// Convert to label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "mcpserver",
            Self::Tool => "mcptool",
            Self::Prompt => "mcpprompt",
            Self::Resource => "mcpresource",
        }
    }
}

/// Aggregated entry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Tool entries in tools.json
    Tool,
    /// Prompt entries in prompts.json
    Prompt,
    /// Resource entries in resources.json
    Resource,
}

impl EntryKind {
    /// Convert to label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Prompt => "prompt",
            Self::Resource => "resource",
        }
    }
}

// ============================================================================
// Metric Recording Helpers
// ============================================================================

/// Record a reconciliation with timing
pub struct ReconcileTimer {
    controller: ControllerKind,
    start: std::time::Instant,
}

impl ReconcileTimer {
    /// Start timing a reconciliation
    pub fn start(controller: ControllerKind) -> Self {
        Self {
            controller,
            start: std::time::Instant::now(),
        }
    }

    /// Record successful completion
    pub fn success(self) {
        self.finish("success");
    }

    /// Record error completion
    pub fn error(self) {
        self.finish("error");
    }

    fn finish(self, result: &'static str) {
        let duration = self.start.elapsed().as_secs_f64();
        let controller = self.controller.as_str();
        RECONCILIATION_DURATION.record(duration, &[KeyValue::new("controller", controller)]);
        RECONCILIATION_TOTAL.add(
            1,
            &[
                KeyValue::new("controller", controller),
                KeyValue::new("result", result),
            ],
        );
    }
}

/// Gauge label identifying an MCPServer across namespaces
pub fn server_label(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Update the aggregated entry gauge for one server
pub fn set_managed_resources(namespace: &str, server: &str, kind: EntryKind, count: usize) {
    MANAGED_RESOURCES.record(
        i64::try_from(count).unwrap_or(i64::MAX),
        &[
            KeyValue::new("kind", kind.as_str()),
            KeyValue::new("server", server_label(namespace, server)),
        ],
    );
}

/// Record a failed MCPServer annotation during fan-out
pub fn record_trigger_failure(namespace: &str) {
    TRIGGER_FAILURES.add(1, &[KeyValue::new("namespace", namespace.to_string())]);
}
