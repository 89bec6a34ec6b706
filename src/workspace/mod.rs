//! The repository as seen by the tool surface.
//!
//! Reads (listing, file content, symbols, metrics) and guarded mutations
//! (diffs, engine plans, checkpoints, rollback) all go through one
//! [`Workspace`] shared behind a tokio `RwLock`.

mod manager;
mod scanner;
mod types;
#[cfg(test)]
mod tests;

// Re-exports
pub use manager::Workspace;
pub use types::{
    create_shared_workspace, with_exclusive, RepoStatus, SafeApplyOutcome, SharedWorkspace,
};
