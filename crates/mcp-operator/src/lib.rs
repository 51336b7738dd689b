//! MCP operator: CLI, CRD installation and controller wiring

#![deny(missing_docs)]

/// Command-line and environment configuration
pub mod config;
/// Controller and delete-watcher futures for the four MCP kinds
pub mod controller_runner;
/// Startup utilities (CRD rendering and installation)
pub mod startup;
