//! MCP (Model Context Protocol) server.
//!
//! Exposes the guarded repository as MCP tools over stdio. Tool failures
//! become JSON-RPC errors whose `data.code` names the failure kind.

mod handlers;
mod server;
mod tools;
mod types;

pub use handlers::run_mcp_server;
