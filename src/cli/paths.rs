use anyhow::{Context, Result};
use std::path::PathBuf;

/// Closest ancestor of the current directory holding a `.git` entry.
pub fn find_git_root() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(|dir| dir.to_path_buf())
}

/// Workspace root: the `--workspace-root` value, else the enclosing git
/// root, else the current directory.
pub fn resolve_workspace_root(workspace_root: Option<String>) -> Result<PathBuf> {
    if let Some(path) = workspace_root {
        return PathBuf::from(&path)
            .canonicalize()
            .with_context(|| format!("Workspace root does not exist: {}", path));
    }

    match find_git_root() {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}
