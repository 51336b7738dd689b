//! MCPServer reconciliation
//!
//! [`aggregate`] turns the selected tools, prompts and resources into the
//! gateway documents; [`controller`] writes them and the gateway workload.

pub mod aggregate;
pub mod controller;

pub use aggregate::{AggregatedPrompt, AggregatedResource, AggregatedTool, Aggregation};
pub use controller::{on_delete, reconcile};
