//! Common utilities for MCP tools.

use rmcp::model::{CallToolResult, Content, ErrorCode};
use rmcp::ErrorData as McpError;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::error::ToolError;

/// Convert a control-plane error into a JSON-RPC error carrying its code in
/// `data.code`.
pub fn to_mcp_error(err: ToolError) -> McpError {
    let code = match &err {
        ToolError::FileNotFound(_) => ErrorCode::RESOURCE_NOT_FOUND,
        ToolError::MethodNotFound(_) => ErrorCode::METHOD_NOT_FOUND,
        ToolError::InvalidDiff(_)
        | ToolError::InvalidFilter(_)
        | ToolError::PathOutsideRepository(_) => ErrorCode::INVALID_PARAMS,
        _ => ErrorCode::INTERNAL_ERROR,
    };
    warn!("Tool call failed [{}]: {}", err.code(), err);
    McpError::new(code, err.to_string(), Some(json!({ "code": err.code() })))
}

/// Successful result holding `value` as pretty JSON text.
pub fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        to_mcp_error(ToolError::Internal(format!("Failed to encode result: {}", e)))
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}
