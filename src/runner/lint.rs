//! Lint output parsing.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub message: String,
    pub severity: String,
}

/// How lines of linter output become issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintParser {
    /// `file:line:message`, splitting on colons
    Positional,
    /// Each non-empty line is an issue with only a message
    WholeLine,
    None,
}

const DEFAULT_SEVERITY: &str = "warning";

impl LintParser {
    pub fn parse(&self, output: &str) -> Vec<LintIssue> {
        output
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    pub fn parse_line(&self, line: &str) -> Option<LintIssue> {
        match self {
            LintParser::Positional => parse_positional(line),
            LintParser::WholeLine => Some(LintIssue {
                file: String::new(),
                line: 0,
                column: None,
                message: line.to_string(),
                severity: DEFAULT_SEVERITY.to_string(),
            }),
            LintParser::None => None,
        }
    }
}

/// The message keeps everything after the second colon verbatim, including
/// leading whitespace and any further colons.
fn parse_positional(line: &str) -> Option<LintIssue> {
    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() < 3 {
        return None;
    }

    Some(LintIssue {
        file: parts[0].trim().to_string(),
        line: parts[1].trim().parse().unwrap_or(0),
        column: None,
        message: parts[2..].join(":"),
        severity: DEFAULT_SEVERITY.to_string(),
    })
}
