//! Per-ecosystem command table.

use std::path::Path;

use crate::process::find_on_path;
use crate::project::ProjectKind;

use super::lint::LintParser;

/// How to pick the command for one step.
#[derive(Debug, Clone, Copy)]
pub enum CommandSpec {
    /// No command known for this ecosystem
    None,
    Fixed(&'static [&'static str]),
    /// `with_config` if any of `config_files` exists in the root, else `fallback`
    ConfigAware {
        config_files: &'static [&'static str],
        with_config: &'static [&'static str],
        fallback: &'static [&'static str],
    },
    /// First candidate whose program is on PATH, else `fallback`
    FirstOnPath {
        candidates: &'static [&'static [&'static str]],
        fallback: Option<&'static [&'static str]>,
    },
}

impl CommandSpec {
    pub fn resolve(&self, root: &Path) -> Option<Vec<String>> {
        let argv: &[&str] = match self {
            CommandSpec::None => return None,
            CommandSpec::Fixed(argv) => *argv,
            CommandSpec::ConfigAware {
                config_files,
                with_config,
                fallback,
            } => {
                if config_files.iter().any(|f| root.join(f).exists()) {
                    *with_config
                } else {
                    *fallback
                }
            }
            CommandSpec::FirstOnPath {
                candidates,
                fallback,
            } => candidates
                .iter()
                .find(|argv| argv.first().is_some_and(|program| find_on_path(program).is_some()))
                .copied()
                .or(*fallback)?,
        };
        Some(argv.iter().map(|s| s.to_string()).collect())
    }
}

/// Build step, which some ecosystems skip outright.
#[derive(Debug, Clone, Copy)]
pub enum BuildStep {
    Skip(&'static str),
    Run(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct Toolchain {
    pub test: CommandSpec,
    pub lint: CommandSpec,
    pub build: BuildStep,
    pub lint_parser: LintParser,
}

const GO: Toolchain = Toolchain {
    test: CommandSpec::Fixed(&["go", "test", "./..."]),
    lint: CommandSpec::FirstOnPath {
        candidates: &[&["golangci-lint", "run"]],
        fallback: Some(&["go", "vet", "./..."]),
    },
    build: BuildStep::Run(&["go", "build", "./..."]),
    lint_parser: LintParser::Positional,
};

const PYTHON: Toolchain = Toolchain {
    test: CommandSpec::ConfigAware {
        config_files: &["pytest.ini", "pyproject.toml"],
        with_config: &["python", "-m", "pytest", "-x", "-q"],
        fallback: &["python", "-m", "unittest", "discover", "-v"],
    },
    lint: CommandSpec::FirstOnPath {
        candidates: &[&["ruff", "check", "."], &["flake8", "."]],
        fallback: None,
    },
    build: BuildStep::Skip("Python does not require build step"),
    lint_parser: LintParser::Positional,
};

const NODE: Toolchain = Toolchain {
    test: CommandSpec::Fixed(&["npm", "test"]),
    lint: CommandSpec::Fixed(&["npm", "run", "lint"]),
    build: BuildStep::Run(&["npm", "run", "build"]),
    lint_parser: LintParser::WholeLine,
};

const UNKNOWN: Toolchain = Toolchain {
    test: CommandSpec::None,
    lint: CommandSpec::None,
    build: BuildStep::Skip("No build step required"),
    lint_parser: LintParser::None,
};

/// Toolchain table lookup.
pub fn toolchain(kind: ProjectKind) -> &'static Toolchain {
    match kind {
        ProjectKind::Go => &GO,
        ProjectKind::Python => &PYTHON,
        ProjectKind::TypeScript | ProjectKind::JavaScript => &NODE,
        ProjectKind::Unknown => &UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_python_test_command_is_config_aware() {
        let dir = TempDir::new().unwrap();
        let fallback = toolchain(ProjectKind::Python).test.resolve(dir.path()).unwrap();
        assert_eq!(fallback, ["python", "-m", "unittest", "discover", "-v"]);

        std::fs::write(dir.path().join("pytest.ini"), "[pytest]\n").unwrap();
        let with_config = toolchain(ProjectKind::Python).test.resolve(dir.path()).unwrap();
        assert_eq!(with_config, ["python", "-m", "pytest", "-x", "-q"]);
    }

    #[test]
    fn test_unknown_has_no_commands() {
        let dir = TempDir::new().unwrap();
        let tc = toolchain(ProjectKind::Unknown);
        assert!(tc.test.resolve(dir.path()).is_none());
        assert!(tc.lint.resolve(dir.path()).is_none());
        assert!(matches!(tc.build, BuildStep::Skip(_)));
    }

    #[test]
    fn test_web_kinds_share_node_toolchain() {
        let dir = TempDir::new().unwrap();
        let ts = toolchain(ProjectKind::TypeScript).test.resolve(dir.path());
        let js = toolchain(ProjectKind::JavaScript).test.resolve(dir.path());
        assert_eq!(ts, js);
        assert_eq!(ts.unwrap(), ["npm", "test"]);
    }
}
