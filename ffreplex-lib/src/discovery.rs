//! Input file discovery

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{ReplexError, Result};

/// Default pattern for batch inputs
pub const DEFAULT_PATTERN: &str = r"\.mkv$";

/// List the files under `root` whose path matches `pattern`, sorted.
///
/// A regular file given as `root` is returned as-is, whatever the pattern.
pub fn list_files(root: &Path, pattern: &Regex) -> Result<Vec<PathBuf>> {
    list_files_excluding(root, pattern, None)
}

/// Like [`list_files`], without descending into `excluded` (typically the
/// output directory of a previous run).
pub fn list_files_excluding(
    root: &Path,
    pattern: &Regex,
    excluded: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(root).map_err(|_| ReplexError::NotFound(root.to_path_buf()))?;
    if meta.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| excluded.map_or(true, |x| e.path() != x))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if pattern.is_match(&entry.path().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    tracing::debug!("{} matching files under {}", files.len(), root.display());
    Ok(files)
}
