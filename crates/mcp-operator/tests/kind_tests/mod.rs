//! Integration tests for the MCP operator
//!
//! Each test runs the controllers in-process against a kind cluster, scoped
//! to a namespace of its own, and tells one story:
//!
//! - `end_to_end`: a tool, a prompt and a resource flow into a server's
//!   ConfigMap together with the gateway Deployment and Service
//!
//! - `deletion`: removing a child removes its entry from the server's
//!   ConfigMap, and removing the server garbage-collects its children

mod deletion;
mod end_to_end;
mod helpers;
