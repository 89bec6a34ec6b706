//! MCP tool implementations.
//!
//! Tools are grouped by concern: reads, checks, history and edits.

mod checks;
mod common;
mod edits;
mod files;
mod history;

// Re-export tool functions
pub use checks::{run_build, run_lint, run_tests};
pub use edits::{apply_diff, apply_diff_safe};
pub use files::{get_complexity, get_symbols, list_files, read_file};
pub use history::{git_checkpoint, git_rollback, git_status};
