//! Unified diff normalization.
//!
//! libgit2 only parses patches that carry a `diff --git` header. Callers
//! usually send plain `---`/`+++` diffs or bare hunks, so the missing
//! headers are synthesized from the target path.

use std::path::{Component, Path};

/// `path` with `.` components removed, in the `/`-separated form git uses.
pub fn clean_path(path: &str) -> String {
    Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Add whatever headers `diff` lacks for libgit2 to parse it as a patch of
/// `path`. The result always ends with a newline.
pub fn normalize_patch(path: &str, diff: &str) -> String {
    let has_git_header = diff.lines().any(|l| l.starts_with("diff --git "));
    let has_file_headers = diff.lines().any(|l| l.starts_with("--- "))
        && diff.lines().any(|l| l.starts_with("+++ "));

    let mut out = String::with_capacity(diff.len() + 3 * path.len() + 32);
    if !has_git_header {
        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        // libgit2 only accepts /dev/null sides when the mode line says so.
        if diff.lines().any(|l| l.trim_end() == "--- /dev/null") {
            out.push_str("new file mode 100644\n");
        } else if diff.lines().any(|l| l.trim_end() == "+++ /dev/null") {
            out.push_str("deleted file mode 100644\n");
        }
        if !has_file_headers {
            out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));
        }
    }
    out.push_str(diff);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
