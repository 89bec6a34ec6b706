//! Symbol metadata for repository files.
//!
//! Source files are opaque text to the control plane; symbol records come
//! from a [`SymbolSource`]. The bundled [`PatternSymbolSource`] recognises
//! top-level declarations line by line and estimates their extent from
//! indentation (Python) or brace depth (everything else). It is a stand-in
//! for a real parser, good enough for navigation and rough metrics.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::domain::{ComplexityMetrics, Language, Symbol};

pub trait SymbolSource: Send + Sync {
    /// Declarations in `content`, ordered by start line.
    fn symbols(&self, path: &str, content: &str) -> Vec<Symbol>;

    /// Metrics for the whole file, or for `symbol`'s line range.
    fn complexity(&self, path: &str, content: &str, symbol: Option<&Symbol>) -> ComplexityMetrics {
        let lines: Vec<&str> = content.lines().collect();
        let slice = match symbol {
            Some(s) => {
                let start = s.start_line.saturating_sub(1).min(lines.len());
                let end = s.end_line.min(lines.len()).max(start);
                &lines[start..end]
            }
            None => &lines[..],
        };
        measure(slice, Language::from_path(path))
    }
}

struct Rule {
    regex: Regex,
    kind: &'static str,
}

fn rule(pattern: &str, kind: &'static str) -> Rule {
    Rule {
        regex: Regex::new(pattern).expect("symbol pattern must compile"),
        kind,
    }
}

fn rules() -> &'static HashMap<Language, Vec<Rule>> {
    static RULES: OnceLock<HashMap<Language, Vec<Rule>>> = OnceLock::new();
    RULES.get_or_init(|| {
        let js = || {
            vec![
                rule(
                    r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\*?\s+(?P<name>[A-Za-z_$][\w$]*)",
                    "function",
                ),
                rule(
                    r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)",
                    "class",
                ),
                rule(
                    r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
                    "function",
                ),
                rule(
                    r"^\s*(?:export\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)",
                    "interface",
                ),
            ]
        };

        let mut map = HashMap::new();
        map.insert(
            Language::Python,
            vec![
                rule(r"^(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)", "function"),
                rule(r"^\s+(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)", "method"),
                rule(r"^\s*class\s+(?P<name>[A-Za-z_]\w*)", "class"),
            ],
        );
        map.insert(
            Language::Go,
            vec![
                rule(r"^func\s+\([^)]*\)\s*(?P<name>[A-Za-z_]\w*)", "method"),
                rule(r"^func\s+(?P<name>[A-Za-z_]\w*)", "function"),
                rule(r"^type\s+(?P<name>[A-Za-z_]\w*)\s+struct\b", "struct"),
                rule(r"^type\s+(?P<name>[A-Za-z_]\w*)\s+interface\b", "interface"),
            ],
        );
        map.insert(
            Language::Rust,
            vec![
                rule(
                    r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(?P<name>[A-Za-z_]\w*)",
                    "function",
                ),
                rule(r"^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+(?P<name>[A-Za-z_]\w*)", "struct"),
                rule(r"^\s*(?:pub(?:\([^)]*\))?\s+)?enum\s+(?P<name>[A-Za-z_]\w*)", "enum"),
                rule(r"^\s*(?:pub(?:\([^)]*\))?\s+)?trait\s+(?P<name>[A-Za-z_]\w*)", "trait"),
            ],
        );
        map.insert(Language::JavaScript, js());
        map.insert(Language::TypeScript, js());
        map
    })
}

fn branch_regex() -> &'static Regex {
    static BRANCH: OnceLock<Regex> = OnceLock::new();
    BRANCH.get_or_init(|| {
        Regex::new(r"\b(?:if|elif|for|while|case|catch|except|match)\b|&&|\|\|")
            .expect("branch pattern must compile")
    })
}

/// Line-pattern symbol extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternSymbolSource;

impl SymbolSource for PatternSymbolSource {
    fn symbols(&self, path: &str, content: &str) -> Vec<Symbol> {
        let language = Language::from_path(path);
        let Some(rules) = rules().get(&language) else {
            return Vec::new();
        };

        let lines: Vec<&str> = content.lines().collect();
        let mut symbols = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let Some((kind, name)) = rules.iter().find_map(|r| {
                r.regex
                    .captures(line)
                    .and_then(|c| c.name("name"))
                    .map(|m| (r.kind, m.as_str().to_string()))
            }) else {
                continue;
            };

            let end = match language {
                Language::Python => indent_block_end(&lines, idx),
                _ => brace_block_end(&lines, idx),
            };

            symbols.push(Symbol {
                name,
                kind: kind.to_string(),
                file: path.to_string(),
                start_line: idx + 1,
                end_line: end + 1,
                signature: Some(line.trim().trim_end_matches('{').trim_end().to_string()),
                references: Vec::new(),
            });
        }

        symbols
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Index of the last line belonging to the indented block opened at `start`.
fn indent_block_end(lines: &[&str], start: usize) -> usize {
    let base = indent_of(lines[start]);
    let mut end = start;
    for (idx, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= base {
            break;
        }
        end = idx;
    }
    end
}

/// Index of the line closing the first brace opened at or after `start`.
fn brace_block_end(lines: &[&str], start: usize) -> usize {
    let mut depth: i64 = 0;
    let mut opened = false;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return idx;
        }
        // Declarations without a body end on their own line.
        if !opened && (line.trim_end().ends_with(';') || idx > start + 3) {
            return start;
        }
    }
    if opened {
        lines.len().saturating_sub(1)
    } else {
        start
    }
}

fn is_code_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#') && !trimmed.starts_with("//")
}

/// Heuristic metrics over a block of lines.
pub fn measure(lines: &[&str], language: Language) -> ComplexityMetrics {
    let code: Vec<&str> = lines.iter().copied().filter(|l| is_code_line(l)).collect();
    let loc = code.len() as i64;
    let base_indent = code.iter().map(|l| indent_of(l)).min().unwrap_or(0);
    let indent_unit = if language == Language::Go { 1 } else { 4 };

    let mut cyclomatic = 1i64;
    let mut cognitive = 0i64;
    for line in &code {
        let branches = branch_regex().find_iter(line).count() as i64;
        if branches == 0 {
            continue;
        }
        let nesting = (indent_of(line).saturating_sub(base_indent) / indent_unit) as i64;
        cyclomatic += branches;
        cognitive += branches * (1 + nesting.saturating_sub(1));
    }

    let maintainability = if loc == 0 {
        100.0
    } else {
        let raw = 171.0 - 0.23 * cyclomatic as f64 - 16.2 * (loc as f64).ln();
        ((raw * 100.0 / 171.0).max(0.0) * 100.0).round() / 100.0
    };

    ComplexityMetrics {
        cyclomatic_complexity: cyclomatic,
        cognitive_complexity: cognitive,
        lines_of_code: loc,
        maintainability_index: maintainability.min(100.0),
        halstead_difficulty: 0.0,
    }
}
