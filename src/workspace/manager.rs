//! The guarded repository.
//!
//! All repository access from the tool surface goes through [`Workspace`].
//! Methods that write to the working tree or history take `&mut self`, so
//! they can only be reached through the write half of a
//! [`SharedWorkspace`](super::SharedWorkspace) lock.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{
    ComplexityMetrics, FileChange, FileInfo, RefactorPlan, RefactorResult, Symbol,
};
use crate::error::{ToolError, ToolResult};
use crate::git::{Checkpoint, Checkpointer, GitCheckpointer, RepoState};
use crate::runner::Runner;
use crate::symbols::{PatternSymbolSource, SymbolSource};

use super::scanner;
use super::types::{RepoStatus, SafeApplyOutcome};

/// Message of the checkpoint taken before every guarded mutation
pub const PRE_CHANGE_MESSAGE: &str = "pre-change";

enum Mutation<'a> {
    Patch { path: &'a str, diff: &'a str },
    Rewrite(&'a [FileChange]),
}

pub struct Workspace {
    root: PathBuf,
    checkpointer: Arc<dyn Checkpointer>,
    runner: Runner,
    symbols: Arc<dyn SymbolSource>,
}

impl Workspace {
    pub fn new(root: PathBuf, config: &Config) -> Self {
        Self::with_parts(
            root.clone(),
            Arc::new(GitCheckpointer::new(root.clone())),
            Runner::with_config(root, config.runner.clone()),
            Arc::new(PatternSymbolSource),
        )
    }

    pub fn with_parts(
        root: PathBuf,
        checkpointer: Arc<dyn Checkpointer>,
        runner: Runner,
        symbols: Arc<dyn SymbolSource>,
    ) -> Self {
        Self {
            root,
            checkpointer,
            runner,
            symbols,
        }
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Run a checkpointer call on the blocking pool.
    async fn git<T, F>(&self, f: F) -> ToolResult<T>
    where
        F: FnOnce(&dyn Checkpointer) -> ToolResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let checkpointer = Arc::clone(&self.checkpointer);
        tokio::task::spawn_blocking(move || f(checkpointer.as_ref())).await?
    }

    /// Map a repository-relative path to an absolute one, refusing anything
    /// that would land outside the root.
    pub fn resolve_path(&self, relative: &str) -> ToolResult<PathBuf> {
        let candidate = Path::new(relative);
        let escapes = candidate.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if relative.trim().is_empty() || escapes {
            return Err(ToolError::PathOutsideRepository(relative.to_string()));
        }

        let full = self.root.join(candidate);
        // Symlinks may still point elsewhere.
        if let (Ok(real), Ok(real_root)) = (full.canonicalize(), self.root.canonicalize()) {
            if !real.starts_with(&real_root) {
                return Err(ToolError::PathOutsideRepository(relative.to_string()));
            }
        }
        Ok(full)
    }

    fn existing_file(&self, relative: &str) -> ToolResult<PathBuf> {
        let full = self.resolve_path(relative)?;
        if !full.is_file() {
            return Err(ToolError::FileNotFound(relative.to_string()));
        }
        Ok(full)
    }

    pub async fn list_files(&self, filter: Option<String>) -> ToolResult<Vec<String>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scanner::list_files(&root, filter.as_deref())).await?
    }

    /// File content as UTF-8, invalid sequences replaced.
    pub async fn read_file(&self, path: &str) -> ToolResult<String> {
        let full = self.existing_file(path)?;
        let bytes = tokio::fs::read(&full).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn symbols(&self, path: &str) -> ToolResult<Vec<Symbol>> {
        let content = self.read_file(path).await?;
        Ok(self.symbols.symbols(path, &content))
    }

    /// Metrics for a file, or for the first symbol named `symbol` in it.
    pub async fn complexity(
        &self,
        path: &str,
        symbol: Option<&str>,
    ) -> ToolResult<ComplexityMetrics> {
        let content = self.read_file(path).await?;
        let Some(name) = symbol else {
            return Ok(self.symbols.complexity(path, &content, None));
        };

        let found = self
            .symbols
            .symbols(path, &content)
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| {
                ToolError::FileNotFound(format!("{} (no symbol named '{}')", path, name))
            })?;
        Ok(self.symbols.complexity(path, &content, Some(&found)))
    }

    /// Source files of known languages, hashed, for engine requests.
    pub async fn collect_files(&self) -> ToolResult<Vec<FileInfo>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scanner::collect_source_files(&root)).await?
    }

    pub async fn status(&self) -> ToolResult<RepoStatus> {
        let project = self.runner.project_kind().to_string();
        self.git(move |cp| {
            let state = cp.state();
            if state == RepoState::NoRepo {
                return Err(ToolError::NotARepository(PathBuf::new()));
            }
            let tree = cp.status()?;
            Ok(RepoStatus {
                state,
                project,
                branch: cp.current_branch().ok(),
                commit: cp.current_commit().ok(),
                clean: tree.clean,
                changed_files: tree.changed_paths.into_iter().collect(),
            })
        })
        .await
        .map_err(|e| match e {
            ToolError::NotARepository(_) => ToolError::NotARepository(self.root.clone()),
            other => other,
        })
    }

    pub async fn checkpoint(&mut self, message: &str) -> ToolResult<Option<Checkpoint>> {
        let message = message.to_string();
        self.git(move |cp| cp.create_checkpoint(&message)).await
    }

    pub async fn rollback(&mut self) -> ToolResult<Checkpoint> {
        self.git(|cp| cp.rollback()).await
    }

    /// Apply a unified diff to `path`. Never checkpoints; a diff that does
    /// not apply leaves the working tree as it was.
    pub async fn apply_diff(&mut self, path: &str, diff: &str) -> ToolResult<()> {
        self.resolve_path(path)?;
        let (path, diff) = (path.to_string(), diff.to_string());
        self.git(move |cp| cp.apply_patch(&path, &diff)).await
    }

    /// Apply a diff inside the checkpoint, test, commit-or-discard workflow.
    pub async fn apply_diff_safe(
        &mut self,
        path: &str,
        diff: &str,
        run_tests: bool,
    ) -> ToolResult<SafeApplyOutcome> {
        self.resolve_path(path)?;
        let message = format!("Apply diff to {}", path);
        self.run_guarded(Mutation::Patch { path, diff }, run_tests, &message)
            .await
    }

    /// Write an engine plan inside the safe workflow.
    ///
    /// Every change is checked against the file on disk first: when the
    /// current content no longer equals `FileChange::original`, nothing is
    /// written and the plan is reported as failed.
    pub async fn apply_plan_safe(
        &mut self,
        plan: &RefactorPlan,
        run_tests: bool,
    ) -> ToolResult<RefactorResult> {
        let metrics_before = self.plan_metrics(
            plan.changes
                .iter()
                .map(|c| (c.path.as_str(), c.original.as_str())),
        );
        let metrics_after = self.plan_metrics(
            plan.changes
                .iter()
                .map(|c| (c.path.as_str(), c.modified.as_str())),
        );

        let message = if plan.description.is_empty() {
            format!("Apply refactor plan {}", plan.session_id)
        } else {
            plan.description.clone()
        };

        let outcome = self
            .run_guarded(Mutation::Rewrite(&plan.changes), run_tests, &message)
            .await?;

        Ok(RefactorResult {
            session_id: plan.session_id.clone(),
            success: outcome.success,
            changes: if outcome.success {
                plan.changes.clone()
            } else {
                Vec::new()
            },
            tests_passed: outcome.tests_passed,
            error: outcome.error,
            metrics_before,
            metrics_after,
        })
    }

    /// Sum of per-file metrics; maintainability is averaged.
    fn plan_metrics<'a>(
        &self,
        files: impl Iterator<Item = (&'a str, &'a str)>,
    ) -> ComplexityMetrics {
        let mut total = ComplexityMetrics::default();
        let mut count = 0usize;
        for (path, content) in files {
            let m = self.symbols.complexity(path, content, None);
            total.cyclomatic_complexity += m.cyclomatic_complexity;
            total.cognitive_complexity += m.cognitive_complexity;
            total.lines_of_code += m.lines_of_code;
            total.maintainability_index += m.maintainability_index;
            total.halstead_difficulty += m.halstead_difficulty;
            count += 1;
        }
        if count > 0 {
            total.maintainability_index /= count as f64;
        }
        total
    }

    async fn run_guarded(
        &mut self,
        mutation: Mutation<'_>,
        run_tests: bool,
        message: &str,
    ) -> ToolResult<SafeApplyOutcome> {
        if let Some(cp) = self.git(|cp| cp.create_checkpoint(PRE_CHANGE_MESSAGE)).await? {
            info!("📌 Checkpoint {} before change", cp.short_id());
        }
        // Without a revision there is nothing to restore to.
        let baseline = self.git(|cp| cp.current_commit()).await?;
        debug!("Baseline revision {}", baseline);

        let mut outcome = SafeApplyOutcome::default();

        if let Err(e) = self.perform(&mutation).await {
            warn!("Change could not be applied: {}", e);
            return self.restore(outcome, e.to_string()).await;
        }

        if run_tests {
            let result = self.runner.run_tests().await;
            outcome.tests_run = !result.skipped;
            outcome.tests_passed = result.success;
            outcome.test_output = Some(result.output);
            if !result.success {
                let reason = if result.timed_out {
                    "Tests timed out".to_string()
                } else {
                    format!("Tests failed (exit code {})", result.exit_code)
                };
                warn!("{}; restoring {}", reason, baseline);
                return self.restore(outcome, reason).await;
            }
        } else {
            // Not requested counts as passing.
            outcome.tests_passed = true;
        }

        let message = message.to_string();
        outcome.checkpoint = self.git(move |cp| cp.create_checkpoint(&message)).await?;
        outcome.success = true;
        if let Some(cp) = &outcome.checkpoint {
            info!("✅ Change committed as {}", cp.short_id());
        }
        Ok(outcome)
    }

    async fn restore(
        &self,
        mut outcome: SafeApplyOutcome,
        error: String,
    ) -> ToolResult<SafeApplyOutcome> {
        self.git(|cp| cp.discard_changes()).await?;
        outcome.rolled_back = true;
        outcome.error = Some(error);
        Ok(outcome)
    }

    async fn perform(&self, mutation: &Mutation<'_>) -> ToolResult<()> {
        match mutation {
            Mutation::Patch { path, diff } => {
                let (path, diff) = (path.to_string(), diff.to_string());
                self.git(move |cp| cp.apply_patch(&path, &diff)).await
            }
            Mutation::Rewrite(changes) => {
                let mut targets = Vec::with_capacity(changes.len());
                for change in changes.iter() {
                    let full = self.resolve_path(&change.path)?;
                    let current = match tokio::fs::read(&full).await {
                        Ok(bytes) => Some(bytes),
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                        Err(e) => return Err(e.into()),
                    };
                    let matches = match &current {
                        Some(bytes) => bytes.as_slice() == change.original.as_bytes(),
                        None => change.original.is_empty(),
                    };
                    if !matches {
                        return Err(ToolError::InvalidDiff(format!(
                            "{} changed since the plan was made",
                            change.path
                        )));
                    }
                    targets.push((full, change.modified.as_str()));
                }

                for (full, modified) in targets {
                    if let Some(parent) = full.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    tokio::fs::write(&full, modified).await?;
                }
                Ok(())
            }
        }
    }
}
