//! Checkpoint and rollback over repository history.
//!
//! Version-control history doubles as the undo log: every mutation is
//! preceded by a checkpoint commit, and a failed mutation is undone by
//! resetting the working tree. The backend sits behind [`Checkpointer`] so
//! the VCS engine can be swapped.

mod patch;
mod repo;

pub use repo::GitCheckpointer;

#[cfg(test)]
pub(crate) use repo::test_support;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::ToolResult;

/// A committed snapshot used as an undo point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    pub revision_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub parent_id: Option<String>,
}

impl Checkpoint {
    /// 8-character prefix of the revision id
    pub fn short_id(&self) -> &str {
        &self.revision_id[..self.revision_id.len().min(8)]
    }
}

/// Snapshot of uncommitted changes, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkingTreeStatus {
    pub clean: bool,
    pub changed_paths: BTreeSet<String>,
}

/// Where the repository stands relative to its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RepoState {
    NoRepo,
    /// Repository exists but has no commits yet
    RepoUninitialized,
    CleanAtHead,
    DirtyUncommitted,
}

/// Narrow VCS interface used by the safe-mutation workflows.
pub trait Checkpointer: Send + Sync {
    fn state(&self) -> RepoState;

    fn is_clean(&self) -> ToolResult<bool>;

    fn status(&self) -> ToolResult<WorkingTreeStatus>;

    /// Fails with `NoCommits` on an unborn repository.
    fn current_branch(&self) -> ToolResult<String>;

    /// 8-character prefix of the HEAD revision.
    fn current_commit(&self) -> ToolResult<String>;

    /// Stage everything (untracked files included) and commit. Returns `None`
    /// when there was nothing to commit.
    fn create_checkpoint(&self, message: &str) -> ToolResult<Option<Checkpoint>>;

    /// Drop the latest commit and its working-tree effects, returning the
    /// revision that is now HEAD.
    fn rollback(&self) -> ToolResult<Checkpoint>;

    /// Sorted paths with uncommitted modification, addition, deletion or
    /// untracked presence.
    fn changed_files(&self) -> ToolResult<Vec<String>>;

    /// Restore the working tree to HEAD, deleting untracked files.
    fn discard_changes(&self) -> ToolResult<()>;

    /// Apply a unified diff touching only `path` to the working tree. Nothing
    /// is written unless the whole patch applies.
    fn apply_patch(&self, path: &str, diff: &str) -> ToolResult<()>;
}
