//! Test, lint and build command execution.
//!
//! The runner classifies the repository, looks the ecosystem up in the
//! toolchain table and executes the resulting command in the repository
//! root. Missing commands and timeouts never surface as errors: they come
//! back as a skipped success or a failed result respectively.

mod lint;
mod toolchain;

pub use lint::LintIssue;

use lint::LintParser;
use toolchain::{toolchain, BuildStep};

use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::process::{isolate_group, kill_group};
use crate::project::{classify, ProjectKind};

/// Exit code reported when the command could not be started or was killed
pub const ABNORMAL_EXIT: i32 = -1;

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Outcome of a test or build command.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub success: bool,
    pub output: String,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub command: String,
    pub exit_code: i32,
    /// No command exists for this ecosystem
    pub skipped: bool,
    pub timed_out: bool,
}

impl TestResult {
    fn skipped(message: &str) -> Self {
        Self {
            success: true,
            output: message.to_string(),
            duration: Duration::ZERO,
            command: String::new(),
            exit_code: 0,
            skipped: true,
            timed_out: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub success: bool,
    pub output: String,
    pub issues: Vec<LintIssue>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub skipped: bool,
}

/// Runs ecosystem commands scoped to one repository root.
#[derive(Debug, Clone)]
pub struct Runner {
    root: PathBuf,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(root: PathBuf) -> Self {
        Self::with_config(root, RunnerConfig::default())
    }

    pub fn with_config(root: PathBuf, config: RunnerConfig) -> Self {
        Self { root, config }
    }

    pub fn project_kind(&self) -> ProjectKind {
        classify(&self.root)
    }

    /// Run the project's test suite.
    pub async fn run_tests(&self) -> TestResult {
        let kind = self.project_kind();
        let command = match &self.config.test_command {
            Some(argv) => Some(argv.clone()),
            None => toolchain(kind).test.resolve(&self.root),
        };

        match command {
            Some(argv) => self.execute(&argv).await,
            None => {
                debug!("No test command for {} project", kind);
                TestResult::skipped("No test command detected for this project type")
            }
        }
    }

    /// Run the project's linter and parse its output.
    pub async fn run_lint(&self) -> LintResult {
        let kind = self.project_kind();
        let tc = toolchain(kind);
        let command = match &self.config.lint_command {
            Some(argv) => Some(argv.clone()),
            None => tc.lint.resolve(&self.root),
        };

        let Some(argv) = command else {
            debug!("No lint command for {} project", kind);
            return LintResult {
                success: true,
                output: "No lint command detected for this project type".to_string(),
                issues: Vec::new(),
                duration: Duration::ZERO,
                skipped: true,
            };
        };

        let parser = match tc.lint_parser {
            LintParser::None => LintParser::Positional,
            parser => parser,
        };

        let result = self.execute(&argv).await;
        LintResult {
            success: result.success,
            issues: parser.parse(&result.output),
            output: result.output,
            duration: result.duration,
            skipped: false,
        }
    }

    /// Build the project. Ecosystems without a build step succeed immediately.
    pub async fn build(&self) -> TestResult {
        if let Some(argv) = &self.config.build_command {
            return self.execute(argv).await;
        }

        match toolchain(self.project_kind()).build {
            BuildStep::Skip(reason) => TestResult::skipped(reason),
            BuildStep::Run(argv) => {
                let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
                self.execute(&argv).await
            }
        }
    }

    /// Execute `argv` in the repository root, bounded by the configured timeout.
    pub async fn execute(&self, argv: &[String]) -> TestResult {
        let command_line = argv.join(" ");
        let start = Instant::now();
        let limit = self.config.timeout();

        let Some((program, args)) = argv.split_first() else {
            return TestResult::skipped("Empty command");
        };

        info!("▶️  Running `{}` in {}", command_line, self.root.display());

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate_group(&mut command);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start `{}`: {}", command_line, e);
                return TestResult {
                    success: false,
                    output: format!("Failed to run command: {}", e),
                    duration: start.elapsed(),
                    command: command_line,
                    exit_code: ABNORMAL_EXIT,
                    skipped: false,
                    timed_out: false,
                };
            }
        };
        let pid = child.id();

        match timeout(limit, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
                if !output.stderr.is_empty() {
                    merged.push('\n');
                    merged.push_str(&String::from_utf8_lossy(&output.stderr));
                }
                let exit_code = output.status.code().unwrap_or(ABNORMAL_EXIT);
                debug!("`{}` exited with {}", command_line, exit_code);

                TestResult {
                    success: exit_code == 0,
                    output: merged,
                    duration: start.elapsed(),
                    command: command_line,
                    exit_code,
                    skipped: false,
                    timed_out: false,
                }
            }
            Ok(Err(e)) => TestResult {
                success: false,
                output: format!("Failed to collect command output: {}", e),
                duration: start.elapsed(),
                command: command_line,
                exit_code: ABNORMAL_EXIT,
                skipped: false,
                timed_out: false,
            },
            Err(_) => {
                // The leader died with the dropped future; sweep its helpers.
                if let Some(pid) = pid {
                    kill_group(pid);
                }
                warn!("`{}` timed out after {:?}", command_line, limit);
                TestResult {
                    success: false,
                    output: format!("Command timed out after {:?}", limit),
                    duration: start.elapsed(),
                    command: command_line,
                    exit_code: ABNORMAL_EXIT,
                    skipped: false,
                    timed_out: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unknown_project_skips_tests_and_lint() {
        let dir = TempDir::new().unwrap();
        let runner = Runner::new(dir.path().to_path_buf());

        let tests = runner.run_tests().await;
        assert!(tests.success);
        assert!(tests.skipped);

        let lint = runner.run_lint().await;
        assert!(lint.success);
        assert!(lint.skipped);
        assert!(lint.issues.is_empty());
    }

    #[tokio::test]
    async fn test_python_build_is_noop_success() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "").unwrap();
        let runner = Runner::new(dir.path().to_path_buf());

        let result = runner.build().await;
        assert!(result.success);
        assert!(result.skipped);
        assert_eq!(result.output, "Python does not require build step");
    }

    #[tokio::test]
    async fn test_execute_merges_output_and_reports_exit_code() {
        let dir = TempDir::new().unwrap();
        let runner = Runner::new(dir.path().to_path_buf());

        let result = runner
            .execute(&argv(&["sh", "-c", "echo out; echo err >&2; exit 3"]))
            .await;
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.output, "out\n\nerr\n");
        assert_eq!(result.command, "sh -c echo out; echo err >&2; exit 3");
    }

    #[tokio::test]
    async fn test_execute_runs_in_repository_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let runner = Runner::new(dir.path().to_path_buf());

        let result = runner.execute(&argv(&["cat", "marker.txt"])).await;
        assert!(result.success);
        assert_eq!(result.output, "here");
    }

    #[tokio::test]
    async fn test_timeout_is_a_failed_result_not_an_error() {
        let dir = TempDir::new().unwrap();
        let config = RunnerConfig {
            timeout_secs: 1,
            ..RunnerConfig::default()
        };
        let runner = Runner::with_config(dir.path().to_path_buf(), config);

        let started = Instant::now();
        let result = runner.execute(&argv(&["sleep", "30"])).await;
        assert!(!result.success);
        assert!(result.timed_out);
        assert_eq!(result.exit_code, ABNORMAL_EXIT);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_failed_result() {
        let dir = TempDir::new().unwrap();
        let runner = Runner::new(dir.path().to_path_buf());

        let result = runner
            .execute(&argv(&["definitely-not-a-real-binary-xyz"]))
            .await;
        assert!(!result.success);
        assert!(!result.timed_out);
        assert!(result.output.starts_with("Failed to run command"));
    }

    #[tokio::test]
    async fn test_configured_commands_override_table() {
        let dir = TempDir::new().unwrap();
        let config = RunnerConfig {
            test_command: Some(argv(&["sh", "-c", "exit 1"])),
            lint_command: Some(argv(&["sh", "-c", "echo 'a.py:3: W291 trailing whitespace'"])),
            ..RunnerConfig::default()
        };
        let runner = Runner::with_config(dir.path().to_path_buf(), config);

        let tests = runner.run_tests().await;
        assert!(!tests.success);
        assert!(!tests.skipped);

        let lint = runner.run_lint().await;
        assert_eq!(lint.issues.len(), 1);
        assert_eq!(lint.issues[0].file, "a.py");
        assert_eq!(lint.issues[0].line, 3);
        assert_eq!(lint.issues[0].message, " W291 trailing whitespace");
    }
}
