//! Startup utilities for the MCP operator

mod crds;

pub use crds::{ensure_crds_installed, render_crds};
