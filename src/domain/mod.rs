//! Domain types shared across modules.
//!
//! These structures cross the boundary to the analysis engine and the MCP
//! clients. The control plane only inspects paths, content and pass/fail
//! fields; everything else is carried through as payload.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A repository file sent to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub content: String,
    /// SHA256 of the content, hex encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Language tag understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
    Unknown,
}

impl Language {
    /// Guess the language of a file from its extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match ext {
            "py" | "pyi" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "rs" => Language::Rust,
            _ => Language::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Symbol {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComplexityMetrics {
    pub cyclomatic_complexity: i64,
    pub cognitive_complexity: i64,
    pub lines_of_code: i64,
    pub maintainability_index: f64,
    pub halstead_difficulty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    pub id: String,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub language: Language,
    pub symbol_type: String,
    pub symbol_name: String,
    #[serde(default)]
    pub metrics: ComplexityMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub id: String,
    pub blocks: Vec<CodeBlock>,
    pub similarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

/// A set of file rewrites proposed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefactorPlan {
    pub session_id: String,
    #[serde(default)]
    pub changes: Vec<FileChange>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub original: String,
    pub modified: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefactorResult {
    pub session_id: String,
    pub success: bool,
    pub changes: Vec<FileChange>,
    pub tests_passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metrics_before: ComplexityMetrics,
    #[serde(default)]
    pub metrics_after: ComplexityMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
    pub loc_before: i64,
    pub loc_after: i64,
    pub loc_reduced: i64,
    pub duplicates_found: usize,
    pub patterns_applied: Vec<PatternApplied>,
    pub files_modified: Vec<String>,
    pub metrics_delta: MetricsDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternApplied {
    pub pattern: String,
    pub files: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsDelta {
    pub cyclomatic_complexity_delta: i64,
    pub cognitive_complexity_delta: i64,
    pub maintainability_index_delta: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path("src/app.py"), Language::Python);
        assert_eq!(Language::from_path("web/index.tsx"), Language::TypeScript);
        assert_eq!(Language::from_path("main.go"), Language::Go);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
    }

    #[test]
    fn test_plan_accepts_missing_optional_fields() {
        let plan: RefactorPlan = serde_json::from_str(
            r#"{"session_id": "s1", "changes": [{"path": "a.py", "original": "x", "modified": "y"}]}"#,
        )
        .unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert!(plan.pattern.is_none());
        assert_eq!(plan.changes[0].description, "");
    }

    #[test]
    fn test_symbol_kind_serializes_as_type() {
        let symbol = Symbol {
            name: "hello".into(),
            kind: "function".into(),
            file: "main.py".into(),
            start_line: 1,
            end_line: 2,
            signature: None,
            references: Vec::new(),
        };
        let value = serde_json::to_value(&symbol).unwrap();
        assert_eq!(value["type"], "function");
        assert!(value.get("signature").is_none());
    }
}
