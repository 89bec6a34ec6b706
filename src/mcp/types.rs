//! MCP tool parameter types.
//!
//! These types are used with rmcp's `Parameters<T>` wrapper for automatic
//! deserialization and JSON schema generation.

use schemars::JsonSchema;
use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// Parameters for tools that take no arguments
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// Parameters for the list_files tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFilesArgs {
    /// Optional glob, e.g. `*.py` or `src/**`
    #[serde(default)]
    pub filter: Option<String>,
}

/// Parameters for tools addressing one file
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PathArgs {
    /// Repository-relative path
    pub path: String,
}

/// Parameters for the get_complexity tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ComplexityArgs {
    /// Repository-relative path
    pub path: String,
    /// Restrict the metrics to this symbol
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Parameters for the apply_diff tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApplyDiffArgs {
    /// Repository-relative path the diff applies to
    pub path: String,
    /// Unified diff; file headers are optional
    pub diff: String,
}

/// Parameters for the apply_diff_safe tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApplyDiffSafeArgs {
    pub path: String,
    pub diff: String,
    /// Run the test suite before keeping the change (default true)
    #[serde(default = "default_true")]
    pub run_tests: bool,
}

/// Parameters for the git_checkpoint tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckpointArgs {
    /// Commit message for the checkpoint
    pub message: String,
}
