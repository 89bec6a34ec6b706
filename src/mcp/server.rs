//! MCP server implementation.
//!
//! This module contains the ReductoMcpServer struct and its tool routing.

use rmcp::{
    handler::server::router::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};

use crate::workspace::SharedWorkspace;

use super::tools;
use super::types::*;

/// Reducto MCP Server
#[derive(Clone)]
pub struct ReductoMcpServer {
    workspace: SharedWorkspace,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ReductoMcpServer {
    pub fn new(workspace: SharedWorkspace) -> Self {
        Self {
            workspace,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "list_files",
        description = "List repository files as sorted repository-relative paths. Ignore rules (.gitignore) are honored. `filter` is an optional glob such as `*.py` or `src/**`."
    )]
    async fn list_files(
        &self,
        Parameters(args): Parameters<ListFilesArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::list_files(&self.workspace, args).await
    }

    #[tool(
        name = "read_file",
        description = "Read a repository file as UTF-8 text. Paths are relative to the repository root and may not escape it."
    )]
    async fn read_file(
        &self,
        Parameters(args): Parameters<PathArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::read_file(&self.workspace, args).await
    }

    #[tool(
        name = "get_symbols",
        description = "List the functions, classes and types declared in a file, in source order."
    )]
    async fn get_symbols(
        &self,
        Parameters(args): Parameters<PathArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::get_symbols(&self.workspace, args).await
    }

    #[tool(
        name = "get_complexity",
        description = "Complexity metrics (cyclomatic, cognitive, lines of code, maintainability index) for a file, or for one named symbol in it."
    )]
    async fn get_complexity(
        &self,
        Parameters(args): Parameters<ComplexityArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::get_complexity(&self.workspace, args).await
    }

    #[tool(
        name = "apply_diff",
        description = "Apply a unified diff to one file. Fails with InvalidDiff, leaving the file untouched, if the diff does not apply cleanly or touches another path. Does not create a checkpoint."
    )]
    async fn apply_diff(
        &self,
        Parameters(args): Parameters<ApplyDiffArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::apply_diff(&self.workspace, args).await
    }

    #[tool(
        name = "apply_diff_safe",
        description = "Apply a unified diff inside a safety net: checkpoint the current state, apply, run the test suite (unless run_tests is false), then commit the result as a new checkpoint, or restore the pre-change state exactly if the diff or the tests fail."
    )]
    async fn apply_diff_safe(
        &self,
        Parameters(args): Parameters<ApplyDiffSafeArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::apply_diff_safe(&self.workspace, args).await
    }

    #[tool(
        name = "run_tests",
        description = "Run the project's test suite (detected from go.mod, pyproject.toml, package.json, ...). Projects without a test command report a skipped success."
    )]
    async fn run_tests(&self, Parameters(_): Parameters<NoArgs>) -> Result<CallToolResult, McpError> {
        tools::run_tests(&self.workspace).await
    }

    #[tool(
        name = "run_lint",
        description = "Run the project's linter and return its output with parsed issues."
    )]
    async fn run_lint(&self, Parameters(_): Parameters<NoArgs>) -> Result<CallToolResult, McpError> {
        tools::run_lint(&self.workspace).await
    }

    #[tool(
        name = "run_build",
        description = "Build the project. Ecosystems without a build step report a skipped success."
    )]
    async fn run_build(&self, Parameters(_): Parameters<NoArgs>) -> Result<CallToolResult, McpError> {
        tools::run_build(&self.workspace).await
    }

    #[tool(
        name = "git_checkpoint",
        description = "Stage every change, untracked files included, and commit it as a checkpoint. Reports created=false when there is nothing to commit."
    )]
    async fn git_checkpoint(
        &self,
        Parameters(args): Parameters<CheckpointArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::git_checkpoint(&self.workspace, args).await
    }

    #[tool(
        name = "git_rollback",
        description = "Discard the latest commit and its working-tree changes, returning the restored checkpoint. Fails with InsufficientHistoryError on the first commit."
    )]
    async fn git_rollback(
        &self,
        Parameters(_): Parameters<NoArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::git_rollback(&self.workspace).await
    }

    #[tool(
        name = "git_status",
        description = "Current branch, commit, clean flag and changed files of the repository."
    )]
    async fn git_status(&self, Parameters(_): Parameters<NoArgs>) -> Result<CallToolResult, McpError> {
        tools::git_status(&self.workspace).await
    }
}

#[tool_handler]
impl ServerHandler for ReductoMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "reducto".to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Reducto exposes a repository for safety-checked refactoring: read files and symbols, run tests, lint and build, apply diffs (apply_diff_safe checkpoints, tests and rolls back on failure), and manage checkpoints."
                    .to_string(),
            ),
        }
    }
}
