//! MCP server startup.
//!
//! Configuration and workspace setup happen in the command layer; this only
//! binds the server to stdio and waits for the client to go away.

use anyhow::{anyhow, Result};
use rmcp::{transport::stdio, ServiceExt};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::workspace::SharedWorkspace;

use super::server::ReductoMcpServer;

/// Serve the tool surface over stdio until the client disconnects.
pub async fn run_mcp_server(workspace: SharedWorkspace) -> Result<()> {
    info!("🔧 Starting reducto MCP server on stdio");

    let service = ReductoMcpServer::new(Arc::clone(&workspace))
        .serve(stdio())
        .await
        .map_err(|e| {
            error!("MCP handshake failed: {:?}", e);
            anyhow!("Failed to start MCP service: {:?}", e)
        })?;
    info!("✅ MCP server ready");

    let reason = service.waiting().await.map_err(|e| {
        error!("MCP service error: {:?}", e);
        anyhow!("MCP service error: {:?}", e)
    })?;

    info!("MCP client disconnected ({:?}), shutting down", reason);
    drain(&workspace).await;
    Ok(())
}

/// Wait until no mutation holds the workspace, so none is cut off between
/// applying a change and committing or discarding it.
async fn drain(workspace: &SharedWorkspace) {
    let _idle = workspace.write().await;
    debug!("No workspace mutation in flight");
}
