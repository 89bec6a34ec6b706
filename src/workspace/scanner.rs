//! File enumeration and collection.
//!
//! Uses `ignore::WalkBuilder` so `.gitignore` rules apply at every level of
//! the tree. An optional glob narrows the listing through an override set.

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::domain::{FileInfo, Language};
use crate::error::{ToolError, ToolResult};

/// Maximum file size to read (1MB).
/// Larger files are left out of engine payloads.
pub const MAX_READABLE_FILE_SIZE: u64 = 1024 * 1024;

/// Directories never listed, even without an ignore file
pub const DEFAULT_IGNORED_DIRS: &[&str] = &["node_modules", "target", "__pycache__", "venv"];

/// Hex SHA-256 of file content.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn build_walker(root_path: &Path, filter: Option<&str>) -> ToolResult<WalkBuilder> {
    let mut builder = WalkBuilder::new(root_path);

    // Hidden files, .gitignore, global excludes and .git/info/exclude
    builder.standard_filters(true);
    builder.require_git(false);
    builder.follow_links(false);
    builder.filter_entry(|entry| {
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        !(is_dir
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| DEFAULT_IGNORED_DIRS.contains(&name)))
    });

    if let Some(glob) = filter.map(str::trim).filter(|g| !g.is_empty()) {
        let mut override_builder = OverrideBuilder::new(root_path);
        override_builder
            .add(glob)
            .map_err(|e| ToolError::InvalidFilter(format!("'{}': {}", glob, e)))?;
        let overrides = override_builder
            .build()
            .map_err(|e| ToolError::InvalidFilter(format!("'{}': {}", glob, e)))?;
        builder.overrides(overrides);
    }

    Ok(builder)
}

fn relative_path(path: &Path, root_path: &Path) -> Option<String> {
    path.strip_prefix(root_path)
        .ok()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

/// Repository-relative paths of all non-ignored files, sorted.
pub fn list_files(root_path: &Path, filter: Option<&str>) -> ToolResult<Vec<String>> {
    debug!("Listing files under {}", root_path.display());

    let mut files = Vec::new();
    for entry in build_walker(root_path, filter)?.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Error walking directory: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        if let Some(relative) = relative_path(entry.path(), root_path) {
            files.push(relative);
        }
    }

    files.sort();
    debug!("Found {} files", files.len());
    Ok(files)
}

/// Read every source file of a known language into engine payloads.
///
/// Oversized and non-UTF-8 files are skipped.
pub fn collect_source_files(root_path: &Path) -> ToolResult<Vec<FileInfo>> {
    let files = list_files(root_path, None)?
        .into_iter()
        .filter(|p| Language::from_path(p) != Language::Unknown)
        .filter_map(|p| process_file(root_path, &p))
        .collect::<Vec<_>>();
    debug!("Collected {} source files", files.len());
    Ok(files)
}

fn process_file(root_path: &Path, relative: &str) -> Option<FileInfo> {
    let path = root_path.join(relative);
    let metadata = match fs::metadata(&path) {
        Ok(m) => m,
        Err(e) => {
            warn!("Failed to get metadata for {}: {}", path.display(), e);
            return None;
        }
    };

    if metadata.len() > MAX_READABLE_FILE_SIZE {
        debug!(
            "Skipping large file ({} bytes): {}",
            metadata.len(),
            path.display()
        );
        return None;
    }

    let content = match fs::read(&path).map(String::from_utf8) {
        Ok(Ok(s)) => s,
        Ok(Err(_)) => {
            debug!("Skipping binary file: {}", path.display());
            return None;
        }
        Err(e) => {
            warn!("Failed to read file {}: {}", path.display(), e);
            return None;
        }
    };

    Some(FileInfo {
        path: relative.to_string(),
        hash: Some(content_hash(&content)),
        content,
    })
}
