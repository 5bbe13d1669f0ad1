//! Project directory validation and discovery.

use crate::config::EditorConfig;
use crate::error::{Result, StagehandError};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Check that `target` is a well-formed project directory.
///
/// A malformed target is fatal to `connect` — this is the one failure the
/// registry never retries or degrades around.
pub fn validate_project(target: &Path) -> Result<()> {
    if !target.is_dir() {
        return Err(StagehandError::InvalidTarget {
            path: target.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    for marker in EditorConfig::PROJECT_MARKERS {
        if !target.join(marker).is_dir() {
            return Err(StagehandError::InvalidTarget {
                path: target.to_path_buf(),
                reason: format!("missing {}/ directory", marker),
            });
        }
    }

    Ok(())
}

/// Whether `path` looks like a project directory.
pub fn is_project_dir(path: &Path) -> bool {
    validate_project(path).is_ok()
}

/// Walk `search_root` and collect project directories.
///
/// Like process location, the result is advisory: projects may appear or
/// vanish at any time. Unreadable subtrees are skipped, not fatal.
pub fn discover(search_root: &Path) -> Result<Vec<PathBuf>> {
    if !search_root.is_dir() {
        return Err(StagehandError::InvalidTarget {
            path: search_root.to_path_buf(),
            reason: "search root is not a directory".to_string(),
        });
    }

    let mut found: Vec<PathBuf> = WalkDir::new(search_root)
        .max_depth(EditorConfig::DISCOVER_MAX_DEPTH)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| is_project_dir(entry.path()))
        .map(|entry| entry.path().to_path_buf())
        .collect();

    found.sort();
    debug!("Discovered {} project(s) under {:?}", found.len(), search_root);
    Ok(found)
}
