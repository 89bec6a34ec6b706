//! Read-only repository tools.

use rmcp::{model::*, ErrorData as McpError};

use crate::mcp::types::{ComplexityArgs, ListFilesArgs, PathArgs};
use crate::workspace::SharedWorkspace;

use super::common::{json_result, to_mcp_error};

pub async fn list_files(
    workspace: &SharedWorkspace,
    args: ListFilesArgs,
) -> Result<CallToolResult, McpError> {
    let ws = workspace.read().await;
    let files = ws.list_files(args.filter).await.map_err(to_mcp_error)?;
    json_result(&files)
}

pub async fn read_file(
    workspace: &SharedWorkspace,
    args: PathArgs,
) -> Result<CallToolResult, McpError> {
    let ws = workspace.read().await;
    let content = ws.read_file(&args.path).await.map_err(to_mcp_error)?;
    Ok(CallToolResult::success(vec![Content::text(content)]))
}

pub async fn get_symbols(
    workspace: &SharedWorkspace,
    args: PathArgs,
) -> Result<CallToolResult, McpError> {
    let ws = workspace.read().await;
    let symbols = ws.symbols(&args.path).await.map_err(to_mcp_error)?;
    json_result(&symbols)
}

pub async fn get_complexity(
    workspace: &SharedWorkspace,
    args: ComplexityArgs,
) -> Result<CallToolResult, McpError> {
    let ws = workspace.read().await;
    let metrics = ws
        .complexity(&args.path, args.symbol.as_deref())
        .await
        .map_err(to_mcp_error)?;
    json_result(&metrics)
}
