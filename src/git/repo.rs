//! libgit2-backed checkpointer.
//!
//! Stateless: the repository is opened fresh for every call, which keeps the
//! type `Send + Sync` and avoids stale index state between mutations.

use chrono::{DateTime, Utc};
use git2::build::CheckoutBuilder;
use git2::{
    ApplyLocation, ApplyOptions, Commit, Diff, ErrorCode, IndexAddOption, Repository, ResetType,
    Signature, Status, StatusOptions,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{ToolError, ToolResult};

use super::patch::{clean_path, normalize_patch};
use super::{Checkpoint, Checkpointer, RepoState, WorkingTreeStatus};

/// Author and committer name on checkpoint commits
pub const AUTOMATION_NAME: &str = "reducto";
pub const AUTOMATION_EMAIL: &str = "reducto@localhost";

const SHORT_ID_LEN: usize = 8;

/// Checkpointer for the git repository rooted at a directory.
#[derive(Debug, Clone)]
pub struct GitCheckpointer {
    root: PathBuf,
}

impl GitCheckpointer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn open(&self) -> ToolResult<Repository> {
        Repository::open(&self.root).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                ToolError::NotARepository(self.root.clone())
            } else {
                ToolError::Git(e)
            }
        })
    }

    fn head_commit(repo: &Repository) -> ToolResult<Commit<'_>> {
        match repo.head() {
            Ok(head) => Ok(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Err(ToolError::NoCommits)
            }
            Err(e) => Err(ToolError::Git(e)),
        }
    }

    fn checkpoint_of(commit: &Commit<'_>) -> Checkpoint {
        Checkpoint {
            revision_id: commit.id().to_string(),
            message: commit.message().unwrap_or_default().trim_end().to_string(),
            timestamp: DateTime::from_timestamp(commit.time().seconds(), 0)
                .unwrap_or_else(Utc::now),
            parent_id: commit.parent_ids().next().map(|oid| oid.to_string()),
        }
    }

    /// Uncommitted entries as (path, status), ignored files excluded.
    fn dirty_entries(repo: &Repository) -> ToolResult<Vec<(String, Status)>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .renames_head_to_index(false);

        let statuses = repo.statuses(Some(&mut opts))?;
        let mut entries = Vec::with_capacity(statuses.len());
        for entry in statuses.iter() {
            let status = entry.status();
            if status == Status::CURRENT || status.contains(Status::IGNORED) {
                continue;
            }
            if let Some(path) = entry.path() {
                entries.push((path.to_string(), status));
            }
        }
        Ok(entries)
    }

    /// Remove `path` and any directories it leaves empty, up to the root.
    fn remove_untracked(&self, relative: &str) -> ToolResult<()> {
        let path = self.root.join(relative);
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else if path.exists() {
            fs::remove_file(&path)?;
        }

        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == self.root {
                break;
            }
            let is_empty = fs::read_dir(current)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !is_empty {
                break;
            }
            fs::remove_dir(current)?;
            dir = current.parent();
        }
        Ok(())
    }
}

impl Checkpointer for GitCheckpointer {
    fn state(&self) -> RepoState {
        let repo = match self.open() {
            Ok(repo) => repo,
            Err(_) => return RepoState::NoRepo,
        };
        if Self::head_commit(&repo).is_err() {
            return RepoState::RepoUninitialized;
        }
        match Self::dirty_entries(&repo) {
            Ok(entries) if entries.is_empty() => RepoState::CleanAtHead,
            _ => RepoState::DirtyUncommitted,
        }
    }

    fn is_clean(&self) -> ToolResult<bool> {
        let repo = self.open()?;
        Ok(Self::dirty_entries(&repo)?.is_empty())
    }

    fn status(&self) -> ToolResult<WorkingTreeStatus> {
        let changed_paths: std::collections::BTreeSet<String> =
            self.changed_files()?.into_iter().collect();
        Ok(WorkingTreeStatus {
            clean: changed_paths.is_empty(),
            changed_paths,
        })
    }

    fn current_branch(&self) -> ToolResult<String> {
        let repo = self.open()?;
        Self::head_commit(&repo)?;
        let head = repo.head()?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    fn current_commit(&self) -> ToolResult<String> {
        let repo = self.open()?;
        let commit = Self::head_commit(&repo)?;
        let id = commit.id().to_string();
        Ok(id[..SHORT_ID_LEN].to_string())
    }

    fn create_checkpoint(&self, message: &str) -> ToolResult<Option<Checkpoint>> {
        let repo = self.open()?;
        let mut index = repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = match Self::head_commit(&repo) {
            Ok(commit) => Some(commit),
            Err(ToolError::NoCommits) => None,
            Err(e) => return Err(e),
        };

        let unchanged = match &parent {
            Some(commit) => commit.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            debug!("Nothing to checkpoint for '{}'", message);
            return Ok(None);
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = Signature::now(AUTOMATION_NAME, AUTOMATION_EMAIL)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        let commit = repo.find_commit(oid)?;

        let checkpoint = Self::checkpoint_of(&commit);
        info!("📌 Checkpoint {} '{}'", checkpoint.short_id(), message);
        Ok(Some(checkpoint))
    }

    fn rollback(&self) -> ToolResult<Checkpoint> {
        let repo = self.open()?;
        let head = Self::head_commit(&repo)?;
        if head.parent_count() == 0 {
            return Err(ToolError::InsufficientHistory);
        }

        let parent = head.parent(0)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.reset(parent.as_object(), ResetType::Hard, Some(&mut checkout))?;

        let restored = Self::checkpoint_of(&parent);
        info!(
            "⏪ Rolled back {} to {}",
            &head.id().to_string()[..SHORT_ID_LEN],
            restored.short_id()
        );
        Ok(restored)
    }

    fn changed_files(&self) -> ToolResult<Vec<String>> {
        let repo = self.open()?;
        let mut paths: Vec<String> = Self::dirty_entries(&repo)?
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn discard_changes(&self) -> ToolResult<()> {
        let repo = self.open()?;
        let head = Self::head_commit(&repo)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.reset(head.as_object(), ResetType::Hard, Some(&mut checkout))?;

        for (path, status) in Self::dirty_entries(&repo)? {
            if status.contains(Status::WT_NEW) {
                debug!("Removing untracked {}", path);
                self.remove_untracked(&path)?;
            } else {
                warn!("{} still differs from HEAD after reset ({:?})", path, status);
            }
        }
        Ok(())
    }

    fn apply_patch(&self, path: &str, diff: &str) -> ToolResult<()> {
        if !diff.lines().any(|line| line.starts_with("@@ ")) {
            return Err(ToolError::InvalidDiff("patch contains no hunks".into()));
        }

        let path = clean_path(path);
        let repo = self.open()?;
        let normalized = normalize_patch(&path, diff);
        let diff = Diff::from_buffer(normalized.as_bytes())
            .map_err(|e| ToolError::InvalidDiff(e.message().to_string()))?;

        if diff.deltas().len() == 0 {
            return Err(ToolError::InvalidDiff("patch contains no changes".into()));
        }

        let target = Path::new(&path);
        let dev_null = Path::new("/dev/null");
        for delta in diff.deltas() {
            let stray = [delta.old_file().path(), delta.new_file().path()]
                .into_iter()
                .flatten()
                .find(|p| *p != target && *p != dev_null);
            if let Some(other) = stray {
                return Err(ToolError::InvalidDiff(format!(
                    "patch touches {} but the target is {}",
                    other.display(),
                    path
                )));
            }
        }

        // Dry run first so a failing hunk leaves the working tree untouched.
        let mut check = ApplyOptions::new();
        check.check(true);
        repo.apply(&diff, ApplyLocation::WorkDir, Some(&mut check))
            .map_err(|e| ToolError::InvalidDiff(e.message().to_string()))?;

        repo.apply(&diff, ApplyLocation::WorkDir, None)
            .map_err(|e| ToolError::InvalidDiff(e.message().to_string()))?;

        debug!("Applied patch to {}", path);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{commit_files, init_repo};
    use super::*;
    use tempfile::TempDir;

    fn checkpointer(dir: &TempDir) -> GitCheckpointer {
        GitCheckpointer::new(dir.path().to_path_buf())
    }

    fn read(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_not_a_repository() {
        let dir = TempDir::new().unwrap();
        let cp = checkpointer(&dir);
        assert_eq!(cp.state(), RepoState::NoRepo);
        assert!(matches!(cp.is_clean(), Err(ToolError::NotARepository(_))));
    }

    #[test]
    fn test_clean_and_dirty() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("test.txt", "test")]);
        let cp = checkpointer(&dir);
        assert!(cp.is_clean().unwrap());
        assert_eq!(cp.state(), RepoState::CleanAtHead);

        fs::write(dir.path().join("untracked.txt"), "untracked").unwrap();
        assert!(!cp.is_clean().unwrap());
        assert_eq!(cp.state(), RepoState::DirtyUncommitted);
    }

    #[test]
    fn test_ignored_files_do_not_dirty_the_tree() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[(".gitignore", "*.log\n")]);
        fs::write(dir.path().join("debug.log"), "noise").unwrap();
        assert!(checkpointer(&dir).is_clean().unwrap());
    }

    #[test]
    fn test_current_branch_requires_commits() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[]);
        let cp = checkpointer(&dir);
        assert_eq!(cp.state(), RepoState::RepoUninitialized);
        assert!(matches!(cp.current_branch(), Err(ToolError::NoCommits)));
        assert!(matches!(cp.current_commit(), Err(ToolError::NoCommits)));
    }

    #[test]
    fn test_current_branch_and_commit() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("test.txt", "test")]);
        let cp = checkpointer(&dir);

        let branch = cp.current_branch().unwrap();
        assert!(branch == "master" || branch == "main", "got {}", branch);

        let commit = cp.current_commit().unwrap();
        assert_eq!(commit.len(), 8);
        assert_eq!(cp.current_commit().unwrap(), commit);
    }

    #[test]
    fn test_checkpoint_leaves_tree_clean() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path(), &[("a.txt", "one")]);
        fs::write(dir.path().join("a.txt"), "two").unwrap();
        fs::write(dir.path().join("b.txt"), "new").unwrap();

        let cp = checkpointer(&dir);
        let checkpoint = cp.create_checkpoint("pre-change").unwrap().unwrap();
        assert!(cp.is_clean().unwrap());
        assert_eq!(checkpoint.message, "pre-change");
        assert!(checkpoint.parent_id.is_some());
        assert_eq!(cp.current_commit().unwrap(), checkpoint.short_id());

        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.author().name(), Some(AUTOMATION_NAME));
        assert_eq!(head.author().email(), Some(AUTOMATION_EMAIL));
    }

    #[test]
    fn test_checkpoint_records_deletions() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("a.txt", "one"), ("b.txt", "two")]);
        fs::remove_file(dir.path().join("b.txt")).unwrap();

        let cp = checkpointer(&dir);
        assert_eq!(cp.changed_files().unwrap(), vec!["b.txt".to_string()]);
        cp.create_checkpoint("drop b").unwrap().unwrap();
        assert!(cp.is_clean().unwrap());
    }

    #[test]
    fn test_checkpoint_without_changes_is_noop() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("a.txt", "one")]);
        let cp = checkpointer(&dir);
        let before = cp.current_commit().unwrap();

        assert!(cp.create_checkpoint("nothing").unwrap().is_none());
        assert_eq!(cp.current_commit().unwrap(), before);
    }

    #[test]
    fn test_first_checkpoint_in_empty_repo() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[]);
        let cp = checkpointer(&dir);
        assert!(cp.create_checkpoint("empty").unwrap().is_none());

        fs::write(dir.path().join("a.txt"), "one").unwrap();
        let checkpoint = cp.create_checkpoint("first").unwrap().unwrap();
        assert!(checkpoint.parent_id.is_none());
        assert_eq!(cp.state(), RepoState::CleanAtHead);
    }

    #[test]
    fn test_rollback_single_commit_fails_and_changes_nothing() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("test.txt", "test")]);
        let cp = checkpointer(&dir);
        let before = cp.current_commit().unwrap();

        assert!(matches!(cp.rollback(), Err(ToolError::InsufficientHistory)));
        assert_eq!(cp.current_commit().unwrap(), before);
        assert_eq!(read(&dir, "test.txt"), "test");
        assert!(cp.is_clean().unwrap());
    }

    #[test]
    fn test_rollback_inverts_latest_checkpoint() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("first.txt", "first\n")]);
        let cp = checkpointer(&dir);
        let base = cp.current_commit().unwrap();

        fs::write(dir.path().join("first.txt"), "rewritten\n").unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/second.txt"), "second").unwrap();
        cp.create_checkpoint("second").unwrap().unwrap();

        let restored = cp.rollback().unwrap();
        assert_eq!(restored.short_id(), base);
        assert_eq!(cp.current_commit().unwrap(), base);
        assert!(!dir.path().join("pkg/second.txt").exists());
        assert_eq!(read(&dir, "first.txt"), "first\n");
        assert!(cp.is_clean().unwrap());
    }

    #[test]
    fn test_changed_files_lists_all_kinds() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("keep.txt", "k"), ("edit.txt", "e"), ("gone.txt", "g")]);
        let cp = checkpointer(&dir);
        assert!(cp.changed_files().unwrap().is_empty());

        fs::write(dir.path().join("edit.txt"), "edited").unwrap();
        fs::remove_file(dir.path().join("gone.txt")).unwrap();
        fs::write(dir.path().join("new.txt"), "n").unwrap();

        assert_eq!(
            cp.changed_files().unwrap(),
            vec!["edit.txt".to_string(), "gone.txt".to_string(), "new.txt".to_string()]
        );
        let status = cp.status().unwrap();
        assert!(!status.clean);
        assert!(status.changed_paths.contains("new.txt"));
    }

    #[test]
    fn test_discard_changes_restores_head_exactly() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("a.txt", "original\n")]);
        fs::write(dir.path().join("a.txt"), "changed\n").unwrap();
        fs::create_dir_all(dir.path().join("fresh/nested")).unwrap();
        fs::write(dir.path().join("fresh/nested/x.txt"), "x").unwrap();

        let cp = checkpointer(&dir);
        cp.discard_changes().unwrap();

        assert_eq!(read(&dir, "a.txt"), "original\n");
        assert!(!dir.path().join("fresh").exists());
        assert!(cp.is_clean().unwrap());
    }

    #[test]
    fn test_apply_patch_applies_cleanly() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("f.txt", "hello\nworld\n")]);
        let cp = checkpointer(&dir);

        cp.apply_patch("f.txt", "--- a/f.txt\n+++ b/f.txt\n@@ -1,2 +1,2 @@\n hello\n-world\n+rust\n")
            .unwrap();
        assert_eq!(read(&dir, "f.txt"), "hello\nrust\n");
    }

    #[test]
    fn test_apply_patch_rejects_mismatched_context() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("f.txt", "hello\nworld\n")]);
        let cp = checkpointer(&dir);

        let err = cp
            .apply_patch("f.txt", "@@ -1,2 +1,2 @@\n goodbye\n-world\n+rust\n")
            .unwrap_err();
        assert_eq!(err.code(), "InvalidDiff");
        assert_eq!(read(&dir, "f.txt"), "hello\nworld\n");
    }

    #[test]
    fn test_apply_patch_rejects_other_paths() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path(), &[("f.txt", "a\n")]);
        commit_files(&repo, &[("g.txt", "a\n")], "second");
        let cp = checkpointer(&dir);

        let err = cp
            .apply_patch("f.txt", "--- a/g.txt\n+++ b/g.txt\n@@ -1 +1 @@\n-a\n+b\n")
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidDiff(_)));
        assert_eq!(read(&dir, "g.txt"), "a\n");
    }

    #[test]
    fn test_apply_patch_creates_file() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("f.txt", "a\n")]);
        let cp = checkpointer(&dir);

        cp.apply_patch("new.py", "--- /dev/null\n+++ b/new.py\n@@ -0,0 +1 @@\n+y = 2\n")
            .unwrap();
        assert_eq!(read(&dir, "new.py"), "y = 2\n");
    }

    #[test]
    fn test_apply_patch_deletes_file() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("f.txt", "a\n"), ("old.py", "x = 1\n")]);
        let cp = checkpointer(&dir);

        cp.apply_patch("old.py", "--- a/old.py\n+++ /dev/null\n@@ -1 +0,0 @@\n-x = 1\n")
            .unwrap();
        assert!(!dir.path().join("old.py").exists());
        assert_eq!(read(&dir, "f.txt"), "a\n");
    }

    #[test]
    fn test_apply_patch_accepts_dot_slash_path() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("f.txt", "hello\n")]);
        let cp = checkpointer(&dir);

        cp.apply_patch("./f.txt", "@@ -1 +1 @@\n-hello\n+rust\n").unwrap();
        assert_eq!(read(&dir, "f.txt"), "rust\n");
    }

    #[test]
    fn test_apply_patch_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("f.txt", "a\n")]);
        let err = checkpointer(&dir)
            .apply_patch("f.txt", "this is not a diff")
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidDiff(_)));
    }
}
