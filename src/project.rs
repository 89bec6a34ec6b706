//! Project classification from marker files.
//!
//! The classifier is a pure function of which marker files exist under the
//! repository root. Checks run in a fixed order and the first match wins.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::domain::Language;

/// Marker whose presence identifies a Go module.
const GO_MARKERS: &[&str] = &["go.mod"];

/// Markers identifying a Python project.
const PYTHON_MARKERS: &[&str] = &["pyproject.toml", "setup.py", "requirements.txt"];

const NODE_MANIFEST: &str = "package.json";

/// Substring searched for in the raw `package.json` text. This is a plain
/// text match, so an unrelated field mentioning it also counts.
const TYPESCRIPT_NEEDLE: &str = "typescript";

/// Toolchain family of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    /// Compiled, statically typed (`go.mod`)
    Go,
    /// Scripting, dynamically typed (`pyproject.toml`, `setup.py`, `requirements.txt`)
    Python,
    /// Web ecosystem with a type checker in the manifest
    TypeScript,
    /// Web ecosystem without one
    JavaScript,
    Unknown,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Go => "go",
            ProjectKind::Python => "python",
            ProjectKind::TypeScript => "typescript",
            ProjectKind::JavaScript => "javascript",
            ProjectKind::Unknown => "unknown",
        }
    }

    /// Language tag sent to the analysis engine
    pub fn language(&self) -> Language {
        match self {
            ProjectKind::Go => Language::Go,
            ProjectKind::Python => Language::Python,
            ProjectKind::TypeScript => Language::TypeScript,
            ProjectKind::JavaScript => Language::JavaScript,
            ProjectKind::Unknown => Language::Unknown,
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the repository at `root`.
pub fn classify(root: &Path) -> ProjectKind {
    if any_exists(root, GO_MARKERS) {
        return ProjectKind::Go;
    }

    if any_exists(root, PYTHON_MARKERS) {
        return ProjectKind::Python;
    }

    if root.join(NODE_MANIFEST).exists() {
        // Unreadable manifests count as untyped.
        let manifest = fs::read_to_string(root.join(NODE_MANIFEST)).unwrap_or_default();
        if manifest.contains(TYPESCRIPT_NEEDLE) {
            return ProjectKind::TypeScript;
        }
        return ProjectKind::JavaScript;
    }

    ProjectKind::Unknown
}

fn any_exists(root: &Path, markers: &[&str]) -> bool {
    markers.iter().any(|marker| root.join(marker).exists())
}
