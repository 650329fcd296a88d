//! Helpers for slash-separated coordination tree paths.
//!
//! Paths are absolute (`/a/b`), never end with `/` (except the root) and
//! never contain empty segments.

use crate::CoordinationError;

pub const ROOT: &str = "/";

/// Joins a parent path and a single child segment.
pub fn join(
    parent: &str,
    child: &str,
) -> String {
    if parent == ROOT {
        format!("/{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// Returns the parent of `path`, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(index) => Some(&path[..index]),
        None => None,
    }
}

/// Returns the last segment of `path`.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn validate(path: &str) -> std::result::Result<(), CoordinationError> {
    if path == ROOT {
        return Ok(());
    }
    if !path.starts_with('/') || path.ends_with('/') || path[1..].split('/').any(str::is_empty) {
        return Err(CoordinationError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Every proper ancestor of `path` except the root, outermost first,
/// followed by `path` itself.
pub fn lineage(path: &str) -> Vec<&str> {
    let mut lineage: Vec<&str> = path
        .char_indices()
        .skip(1)
        .filter(|(_, c)| *c == '/')
        .map(|(index, _)| &path[..index])
        .collect();
    if path != ROOT {
        lineage.push(path);
    }
    lineage
}
