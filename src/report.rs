//! Refactoring reports.
//!
//! Aggregates applied [`RefactorResult`]s into a [`Report`]. Deltas are
//! expressed as improvement: positive numbers mean less complexity or a
//! better maintainability index.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::domain::{ComplexityMetrics, MetricsDelta, PatternApplied, RefactorResult, Report};
use crate::engine::AnalyzeResult;
use crate::error::{ToolError, ToolResult};

/// Directory, relative to the repository root, reports are written to
pub const REPORT_DIR: &str = ".reducto";

impl Report {
    /// Summarize the successful results of one session.
    pub fn from_results(session_id: &str, results: &[RefactorResult]) -> Self {
        let applied: Vec<&RefactorResult> = results.iter().filter(|r| r.success).collect();

        let mut before = ComplexityMetrics::default();
        let mut after = ComplexityMetrics::default();
        for result in &applied {
            before.lines_of_code += result.metrics_before.lines_of_code;
            before.cyclomatic_complexity += result.metrics_before.cyclomatic_complexity;
            before.cognitive_complexity += result.metrics_before.cognitive_complexity;
            before.maintainability_index += result.metrics_before.maintainability_index;
            after.lines_of_code += result.metrics_after.lines_of_code;
            after.cyclomatic_complexity += result.metrics_after.cyclomatic_complexity;
            after.cognitive_complexity += result.metrics_after.cognitive_complexity;
            after.maintainability_index += result.metrics_after.maintainability_index;
        }
        if !applied.is_empty() {
            before.maintainability_index /= applied.len() as f64;
            after.maintainability_index /= applied.len() as f64;
        }

        let files_modified: BTreeSet<String> = applied
            .iter()
            .flat_map(|r| r.changes.iter().map(|c| c.path.clone()))
            .collect();

        Report {
            session_id: session_id.to_string(),
            generated_at: Utc::now(),
            loc_before: before.lines_of_code,
            loc_after: after.lines_of_code,
            loc_reduced: before.lines_of_code - after.lines_of_code,
            duplicates_found: 0,
            patterns_applied: Vec::new(),
            files_modified: files_modified.into_iter().collect(),
            metrics_delta: MetricsDelta {
                cyclomatic_complexity_delta: before.cyclomatic_complexity
                    - after.cyclomatic_complexity,
                cognitive_complexity_delta: before.cognitive_complexity
                    - after.cognitive_complexity,
                maintainability_index_delta: after.maintainability_index
                    - before.maintainability_index,
            },
        }
    }

    pub fn with_duplicates(mut self, found: usize) -> Self {
        self.duplicates_found = found;
        self
    }

    pub fn with_pattern(mut self, pattern: PatternApplied) -> Self {
        self.patterns_applied.push(pattern);
        self
    }

    /// Write the report as JSON under `<root>/.reducto/`.
    pub fn save(&self, root: &Path) -> ToolResult<PathBuf> {
        write_json(root, &format!("reducto-report-{}.json", self.session_id), self)
    }
}

/// Write an analysis as the baseline later reports are compared against.
pub fn save_analysis(root: &Path, session_id: &str, analysis: &AnalyzeResult) -> ToolResult<PathBuf> {
    write_json(root, &format!("reducto-baseline-{}.json", session_id), analysis)
}

fn write_json<T: Serialize>(root: &Path, name: &str, value: &T) -> ToolResult<PathBuf> {
    let dir = root.join(REPORT_DIR);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ToolError::Internal(format!("Failed to encode {}: {}", name, e)))?;
    std::fs::write(&path, json)?;
    Ok(path)
}
