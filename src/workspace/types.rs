//! Workspace types and utilities.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::error::ToolResult;
use crate::git::{Checkpoint, RepoState};

use super::manager::Workspace;

/// Outcome of the checkpoint, apply, test, commit-or-discard workflow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SafeApplyOutcome {
    pub success: bool,
    pub tests_run: bool,
    pub tests_passed: bool,
    pub rolled_back: bool,
    /// Baseline committed after a successful change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Repository summary reported by the status tool
#[derive(Debug, Clone, Serialize)]
pub struct RepoStatus {
    pub state: RepoState,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub clean: bool,
    pub changed_files: Vec<String>,
}

/// Shared workspace type for async operations.
///
/// Read-only calls take the read lock; anything that writes to the working
/// tree or history needs the write lock.
pub type SharedWorkspace = Arc<RwLock<Workspace>>;

/// Create a shared workspace
pub fn create_shared_workspace(workspace: Workspace) -> SharedWorkspace {
    Arc::new(RwLock::new(workspace))
}

/// Run a mutation under the write lock in its own task.
///
/// The task owns the guard, so dropping the caller's future (a cancelled
/// request) does not interrupt the mutation: it runs to its commit or
/// discard before the lock is released.
pub async fn with_exclusive<F, Fut, T>(shared: &SharedWorkspace, f: F) -> ToolResult<T>
where
    F: FnOnce(OwnedRwLockWriteGuard<Workspace>) -> Fut,
    Fut: Future<Output = ToolResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let guard = Arc::clone(shared).write_owned().await;
    tokio::spawn(f(guard)).await?
}
