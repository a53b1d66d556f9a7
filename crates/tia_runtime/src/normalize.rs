//! Source path normalization.
//!
//! The coverage index and change-list resolution key sources by normalized
//! repo-relative paths: forward slashes, no `.` segments, no duplicate
//! separators. Paths that cannot be expressed relative to the repo root are
//! rejected by the callers.

use std::path::Path;

/// Normalizes separators: backslashes become forward slashes, consecutive
/// separators collapse, `.` segments and trailing slashes are dropped.
pub fn normalize_separators(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        if segment.is_empty() || segment == "." {
            continue;
        }
        segments.push(segment);
    }
    segments.join("/")
}

/// Converts a coverage artifact path into a normalized repo-relative path.
///
/// Absolute paths must live under `repo_root`; anything else returns `None`.
pub fn to_repo_relative(path: &Path, repo_root: &Path) -> Option<String> {
    let relative = path.strip_prefix(repo_root).ok()?;
    let normalized = normalize_separators(&relative.to_string_lossy());
    if normalized.is_empty() {
        return None;
    }
    Some(normalized)
}

/// Converts a change-list path into a normalized repo-relative path.
///
/// Relative paths are taken to be repo-relative already; absolute paths are
/// relativized against `repo_root`. Paths outside the repo, paths escaping
/// it via `..`, and empty paths return `None`.
pub fn normalize_change_path(path: &Path, repo_root: &Path) -> Option<String> {
    let candidate = if path.is_absolute() {
        path.strip_prefix(repo_root).ok()?.to_path_buf()
    } else {
        path.to_path_buf()
    };
    let normalized = normalize_separators(&candidate.to_string_lossy());
    if normalized.is_empty() || normalized.split('/').any(|segment| segment == "..") {
        return None;
    }
    Some(normalized)
}
