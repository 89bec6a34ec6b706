//! Checkpoint, rollback and status tools.

use rmcp::{model::*, ErrorData as McpError};
use serde_json::json;
use tracing::info;

use crate::mcp::types::CheckpointArgs;
use crate::workspace::{with_exclusive, SharedWorkspace};

use super::common::{json_result, to_mcp_error};

pub async fn git_checkpoint(
    workspace: &SharedWorkspace,
    args: CheckpointArgs,
) -> Result<CallToolResult, McpError> {
    let message = args.message;
    let checkpoint = with_exclusive(workspace, move |mut ws| async move {
        ws.checkpoint(&message).await
    })
    .await
    .map_err(to_mcp_error)?;

    match checkpoint {
        Some(cp) => {
            info!("📌 Checkpoint {}: {}", cp.short_id(), cp.message);
            json_result(&json!({ "created": true, "checkpoint": cp }))
        }
        None => json_result(&json!({ "created": false, "reason": "No changes to checkpoint" })),
    }
}

pub async fn git_rollback(workspace: &SharedWorkspace) -> Result<CallToolResult, McpError> {
    let restored = with_exclusive(workspace, |mut ws| async move { ws.rollback().await })
        .await
        .map_err(to_mcp_error)?;
    info!("⏪ Rolled back to {}", restored.short_id());
    json_result(&restored)
}

pub async fn git_status(workspace: &SharedWorkspace) -> Result<CallToolResult, McpError> {
    let ws = workspace.read().await;
    let status = ws.status().await.map_err(to_mcp_error)?;
    json_result(&status)
}
