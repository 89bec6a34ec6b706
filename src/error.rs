//! Error types shared by the control plane.
//!
//! Every failure that can cross the protocol boundary is a [`ToolError`]
//! carrying a stable string code, so callers can branch on the kind of
//! failure without parsing messages.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Typed control-plane error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid diff: {0}")]
    InvalidDiff(String),

    #[error("Engine did not become healthy within {0:?}")]
    StartupTimeout(Duration),

    #[error("Cannot roll back: the current revision has no parent")]
    InsufficientHistory,

    #[error("Repository has no commits")]
    NoCommits,

    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Path escapes the repository root: {0}")]
    PathOutsideRepository(String),

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    /// Stable identifier reported to protocol clients.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::FileNotFound(_) => "FileNotFound",
            ToolError::MethodNotFound(_) => "MethodNotFound",
            ToolError::InvalidDiff(_) => "InvalidDiff",
            ToolError::StartupTimeout(_) => "StartupTimeoutError",
            ToolError::InsufficientHistory => "InsufficientHistoryError",
            ToolError::NoCommits => "NoCommitsError",
            ToolError::NotARepository(_) => "NotARepository",
            ToolError::InvalidFilter(_) => "InvalidFilter",
            ToolError::PathOutsideRepository(_) => "PathOutsideRepository",
            ToolError::EngineUnavailable(_) => "EngineUnavailable",
            ToolError::Engine(_) => "EngineError",
            ToolError::Git(_) => "GitError",
            ToolError::Io(_) => "IoError",
            ToolError::Internal(_) => "Internal",
        }
    }
}

impl From<tokio::task::JoinError> for ToolError {
    fn from(err: tokio::task::JoinError) -> Self {
        ToolError::Internal(format!("Background task failed: {}", err))
    }
}

/// Result type for control-plane operations
pub type ToolResult<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            ToolError::FileNotFound("a.py".into()).code(),
            "FileNotFound"
        );
        assert_eq!(ToolError::InsufficientHistory.code(), "InsufficientHistoryError");
        assert_eq!(ToolError::NoCommits.code(), "NoCommitsError");
        assert_eq!(
            ToolError::StartupTimeout(Duration::from_secs(1)).code(),
            "StartupTimeoutError"
        );
    }

    #[test]
    fn test_display_includes_detail() {
        let err = ToolError::InvalidDiff("hunk 1 failed".into());
        assert_eq!(err.to_string(), "Invalid diff: hunk 1 failed");
    }
}
