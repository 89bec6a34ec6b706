//! Tests for workspace module.

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::domain::{FileChange, RefactorPlan};
    use crate::error::ToolError;
    use crate::git::test_support::{commit_files, init_repo};
    use crate::git::{Checkpointer, GitCheckpointer, RepoState};
    use crate::workspace::manager::PRE_CHANGE_MESSAGE;
    use crate::workspace::scanner::content_hash;
    use crate::workspace::{create_shared_workspace, with_exclusive, Workspace};
    use git2::Repository;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const ORIGINAL: &str = "def hello():\n    return 1\n";
    const PATCHED: &str = "def hello():\n    return 2\n";
    const DIFF: &str = "--- a/main.py\n+++ b/main.py\n@@ -1,2 +1,2 @@\n def hello():\n-    return 1\n+    return 2\n";

    const PASSING: &[&str] = &["sh", "-c", "grep -q 'return 2' main.py"];
    const FAILING: &[&str] = &["sh", "-c", "echo 'assert failed'; exit 1"];
    const SLOW: &[&str] = &["sh", "-c", "sleep 1; grep -q 'return 2' main.py"];

    fn workspace(dir: &TempDir, test_command: &[&str]) -> Workspace {
        let mut config = Config::default();
        config.runner.test_command = Some(test_command.iter().map(|s| s.to_string()).collect());
        Workspace::new(dir.path().to_path_buf(), &config)
    }

    fn read(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join(name)).unwrap()
    }

    fn head_message(dir: &TempDir) -> String {
        let repo = Repository::open(dir.path()).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        head.message().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_safe_apply_with_passing_tests_commits_baseline() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, PASSING);

        let outcome = ws.apply_diff_safe("main.py", DIFF, true).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.tests_run);
        assert!(outcome.tests_passed);
        assert!(!outcome.rolled_back);
        assert!(outcome.checkpoint.is_some());
        assert!(outcome.error.is_none());

        assert_eq!(read(&dir, "main.py"), PATCHED);
        assert_eq!(head_message(&dir), "Apply diff to main.py");
        assert!(GitCheckpointer::new(dir.path().to_path_buf()).is_clean().unwrap());
    }

    #[tokio::test]
    async fn test_safe_apply_with_failing_tests_restores_content() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, FAILING);

        let outcome = ws.apply_diff_safe("main.py", DIFF, true).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.tests_run);
        assert!(!outcome.tests_passed);
        assert!(outcome.rolled_back);
        assert!(outcome.checkpoint.is_none());
        assert!(outcome.test_output.unwrap().contains("assert failed"));

        assert_eq!(read(&dir, "main.py"), ORIGINAL);
        assert!(GitCheckpointer::new(dir.path().to_path_buf()).is_clean().unwrap());
    }

    #[tokio::test]
    async fn test_failed_safe_apply_keeps_prior_uncommitted_work() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        fs::write(dir.path().join("notes.txt"), "work in progress").unwrap();
        let mut ws = workspace(&dir, FAILING);

        let outcome = ws.apply_diff_safe("main.py", DIFF, true).await.unwrap();
        assert!(outcome.rolled_back);

        assert_eq!(read(&dir, "notes.txt"), "work in progress");
        assert_eq!(read(&dir, "main.py"), ORIGINAL);
        assert_eq!(head_message(&dir), PRE_CHANGE_MESSAGE);
    }

    #[tokio::test]
    async fn test_safe_apply_with_bad_diff_reports_error() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, PASSING);

        let bad = "--- a/main.py\n+++ b/main.py\n@@ -1,2 +1,2 @@\n def goodbye():\n-    return 1\n+    return 2\n";
        let outcome = ws.apply_diff_safe("main.py", bad, true).await.unwrap();
        assert!(!outcome.success);
        assert!(!outcome.tests_run);
        assert!(outcome.rolled_back);
        assert!(outcome.error.unwrap().starts_with("Invalid diff"));
        assert_eq!(read(&dir, "main.py"), ORIGINAL);
    }

    #[tokio::test]
    async fn test_safe_apply_without_tests() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, FAILING);

        let outcome = ws.apply_diff_safe("main.py", DIFF, false).await.unwrap();
        assert!(outcome.success);
        assert!(!outcome.tests_run);
        assert!(outcome.tests_passed);
        assert!(!outcome.rolled_back);
        assert!(outcome.test_output.is_none());
        assert_eq!(read(&dir, "main.py"), PATCHED);
    }

    #[tokio::test]
    async fn test_safe_apply_needs_a_revision_to_return_to() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[]);
        let mut ws = workspace(&dir, PASSING);

        let err = ws.apply_diff_safe("main.py", DIFF, true).await.unwrap_err();
        assert!(matches!(err, ToolError::NoCommits));
    }

    #[tokio::test]
    async fn test_apply_diff_does_not_checkpoint() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, PASSING);

        ws.apply_diff("main.py", DIFF).await.unwrap();
        assert_eq!(read(&dir, "main.py"), PATCHED);
        assert_eq!(head_message(&dir), "initial");
        assert_eq!(
            GitCheckpointer::new(dir.path().to_path_buf()).state(),
            RepoState::DirtyUncommitted
        );
    }

    #[tokio::test]
    async fn test_failed_apply_diff_leaves_tree_untouched() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", "def hello():\n    return 3\n")]);
        let mut ws = workspace(&dir, PASSING);

        let err = ws.apply_diff("main.py", DIFF).await.unwrap_err();
        assert_eq!(err.code(), "InvalidDiff");
        assert_eq!(read(&dir, "main.py"), "def hello():\n    return 3\n");
    }

    #[tokio::test]
    async fn test_paths_outside_root_are_rejected() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, PASSING);

        let err = ws.read_file("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, ToolError::PathOutsideRepository(_)));
        let err = ws.read_file("/etc/passwd").await.unwrap_err();
        assert!(matches!(err, ToolError::PathOutsideRepository(_)));
        let err = ws.apply_diff("../main.py", DIFF).await.unwrap_err();
        assert!(matches!(err, ToolError::PathOutsideRepository(_)));
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        fs::write(dir.path().join("blob.bin"), [0x66, 0xff, 0x6f]).unwrap();
        let ws = workspace(&dir, PASSING);

        assert_eq!(ws.read_file("main.py").await.unwrap(), ORIGINAL);
        assert_eq!(ws.read_file("blob.bin").await.unwrap(), "f\u{fffd}o");

        let err = ws.read_file("missing.py").await.unwrap_err();
        assert_eq!(err.code(), "FileNotFound");
    }

    #[tokio::test]
    async fn test_list_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        init_repo(
            dir.path(),
            &[
                ("src/b.py", "b = 1\n"),
                ("a.py", "a = 1\n"),
                ("README.md", "# readme\n"),
                (".gitignore", "*.log\n"),
            ],
        );
        fs::write(dir.path().join("debug.log"), "noise").unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "").unwrap();
        let ws = workspace(&dir, PASSING);

        let all = ws.list_files(None).await.unwrap();
        assert_eq!(all, vec!["README.md", "a.py", "src/b.py"]);

        let python = ws.list_files(Some("*.py".to_string())).await.unwrap();
        assert_eq!(python, vec!["a.py", "src/b.py"]);

        let nested = ws.list_files(Some("src/**".to_string())).await.unwrap();
        assert_eq!(nested, vec!["src/b.py"]);

        let err = ws.list_files(Some("src/[".to_string())).await.unwrap_err();
        assert_eq!(err.code(), "InvalidFilter");
    }

    #[tokio::test]
    async fn test_collect_files_hashes_known_sources() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL), ("notes.txt", "hi\n")]);
        let ws = workspace(&dir, PASSING);

        let files = ws.collect_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "main.py");
        assert_eq!(files[0].hash.as_deref(), Some(content_hash(ORIGINAL).as_str()));
        assert_eq!(content_hash("").len(), 64);
    }

    #[tokio::test]
    async fn test_symbols_and_complexity() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let ws = workspace(&dir, PASSING);

        let symbols = ws.symbols("main.py").await.unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "hello");

        let metrics = ws.complexity("main.py", Some("hello")).await.unwrap();
        assert_eq!(metrics.lines_of_code, 2);

        let err = ws.complexity("main.py", Some("nope")).await.unwrap_err();
        assert_eq!(err.code(), "FileNotFound");
    }

    #[tokio::test]
    async fn test_status_reports_changes() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        fs::write(dir.path().join("new.py"), "x = 1\n").unwrap();
        let ws = workspace(&dir, PASSING);

        let status = ws.status().await.unwrap();
        assert_eq!(status.state, RepoState::DirtyUncommitted);
        assert!(!status.clean);
        assert_eq!(status.changed_files, vec!["new.py"]);
        assert_eq!(status.commit.as_deref().map(str::len), Some(8));
    }

    #[tokio::test]
    async fn test_status_outside_repository() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir, PASSING);

        let err = ws.status().await.unwrap_err();
        assert_eq!(err.code(), "NotARepository");
    }

    #[tokio::test]
    async fn test_checkpoint_and_rollback_through_workspace() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        commit_files(&repo, &[("main.py", PATCHED)], "second");
        let mut ws = workspace(&dir, PASSING);

        let restored = ws.rollback().await.unwrap();
        assert_eq!(restored.message, "initial");
        assert_eq!(read(&dir, "main.py"), ORIGINAL);

        fs::write(dir.path().join("main.py"), PATCHED).unwrap();
        let cp = ws.checkpoint("manual").await.unwrap().unwrap();
        assert_eq!(cp.message, "manual");
        assert!(ws.checkpoint("again").await.unwrap().is_none());
    }

    fn plan(original: &str) -> RefactorPlan {
        serde_json::from_value(serde_json::json!({
            "session_id": "plan-1",
            "description": "Inline constant",
            "changes": [
                {"path": "main.py", "original": original, "modified": PATCHED},
                {"path": "pkg/util.py", "original": "", "modified": "def util():\n    return 2\n"}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_apply_plan_safe_writes_changes() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, PASSING);

        let result = ws.apply_plan_safe(&plan(ORIGINAL), true).await.unwrap();
        assert!(result.success);
        assert!(result.tests_passed);
        assert_eq!(result.session_id, "plan-1");
        assert_eq!(result.changes.len(), 2);
        assert_eq!(result.metrics_before.lines_of_code, 2);
        assert_eq!(result.metrics_after.lines_of_code, 4);

        assert_eq!(read(&dir, "main.py"), PATCHED);
        assert_eq!(read(&dir, "pkg/util.py"), "def util():\n    return 2\n");
        assert_eq!(head_message(&dir), "Inline constant");
    }

    #[tokio::test]
    async fn test_apply_plan_safe_refuses_stale_original() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, PASSING);

        let result = ws
            .apply_plan_safe(&plan("def hello():\n    return 0\n"), true)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.changes.is_empty());
        assert!(result.error.unwrap().contains("changed since the plan was made"));
        assert_eq!(read(&dir, "main.py"), ORIGINAL);
        assert!(!dir.path().join("pkg/util.py").exists());
    }

    #[tokio::test]
    async fn test_apply_plan_safe_discards_new_files_on_failure() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, FAILING);

        let result = ws.apply_plan_safe(&plan(ORIGINAL), true).await.unwrap();
        assert!(!result.success);
        assert_eq!(read(&dir, "main.py"), ORIGINAL);
        assert!(!dir.path().join("pkg/util.py").exists());
    }

    #[tokio::test]
    async fn test_exclusive_mutation_through_shared_workspace() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let shared = create_shared_workspace(workspace(&dir, PASSING));

        let outcome = with_exclusive(&shared, |mut ws| async move {
            ws.apply_diff_safe("main.py", DIFF, true).await
        })
        .await
        .unwrap();
        assert!(outcome.success);

        // The lock is free again once the mutation finished.
        let ws = shared.read().await;
        assert_eq!(ws.read_file("main.py").await.unwrap(), PATCHED);
    }

    #[tokio::test]
    async fn test_apply_diff_creates_new_file() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, PASSING);

        ws.apply_diff("new.py", "--- /dev/null\n+++ b/new.py\n@@ -0,0 +1 @@\n+y = 2\n")
            .await
            .unwrap();
        assert_eq!(read(&dir, "new.py"), "y = 2\n");
        assert_eq!(read(&dir, "main.py"), ORIGINAL);
    }

    #[tokio::test]
    async fn test_apply_diff_accepts_dot_slash_path() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let mut ws = workspace(&dir, PASSING);

        ws.apply_diff("./main.py", DIFF).await.unwrap();
        assert_eq!(read(&dir, "main.py"), PATCHED);
    }

    #[tokio::test]
    async fn test_dropped_request_still_finishes_mutation() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path(), &[("main.py", ORIGINAL)]);
        let shared = create_shared_workspace(workspace(&dir, SLOW));

        let request = with_exclusive(&shared, |mut ws| async move {
            ws.apply_diff_safe("main.py", DIFF, true).await
        });
        // Gives up while the tests are still running.
        assert!(tokio::time::timeout(Duration::from_millis(300), request)
            .await
            .is_err());

        let _ws = shared.write().await;
        assert!(GitCheckpointer::new(dir.path().to_path_buf()).is_clean().unwrap());
        match read(&dir, "main.py").as_str() {
            PATCHED => assert_eq!(head_message(&dir), "Apply diff to main.py"),
            ORIGINAL => assert_ne!(head_message(&dir), "Apply diff to main.py"),
            other => panic!("partial content after dropped request: {:?}", other),
        }
    }
}
