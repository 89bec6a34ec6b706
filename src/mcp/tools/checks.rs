//! Test, lint and build tools.
//!
//! These hold the read lock while the command runs, so no mutation can
//! change the tree under a running suite.

use rmcp::{model::*, ErrorData as McpError};

use crate::workspace::SharedWorkspace;

use super::common::json_result;

pub async fn run_tests(workspace: &SharedWorkspace) -> Result<CallToolResult, McpError> {
    let ws = workspace.read().await;
    json_result(&ws.runner().run_tests().await)
}

pub async fn run_lint(workspace: &SharedWorkspace) -> Result<CallToolResult, McpError> {
    let ws = workspace.read().await;
    json_result(&ws.runner().run_lint().await)
}

pub async fn run_build(workspace: &SharedWorkspace) -> Result<CallToolResult, McpError> {
    let ws = workspace.read().await;
    json_result(&ws.runner().build().await)
}
