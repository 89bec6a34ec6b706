//! Diff application tools.

use rmcp::{model::*, ErrorData as McpError};
use serde_json::json;

use crate::mcp::types::{ApplyDiffArgs, ApplyDiffSafeArgs};
use crate::workspace::{with_exclusive, SharedWorkspace};

use super::common::{json_result, to_mcp_error};

pub async fn apply_diff(
    workspace: &SharedWorkspace,
    args: ApplyDiffArgs,
) -> Result<CallToolResult, McpError> {
    let ApplyDiffArgs { path, diff } = args;
    let applied_to = path.clone();
    with_exclusive(workspace, move |mut ws| async move {
        ws.apply_diff(&path, &diff).await
    })
    .await
    .map_err(to_mcp_error)?;
    json_result(&json!({ "applied": true, "path": applied_to }))
}

pub async fn apply_diff_safe(
    workspace: &SharedWorkspace,
    args: ApplyDiffSafeArgs,
) -> Result<CallToolResult, McpError> {
    let ApplyDiffSafeArgs {
        path,
        diff,
        run_tests,
    } = args;
    let outcome = with_exclusive(workspace, move |mut ws| async move {
        ws.apply_diff_safe(&path, &diff, run_tests).await
    })
    .await
    .map_err(to_mcp_error)?;
    json_result(&outcome)
}
