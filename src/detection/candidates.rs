//! Gathering presumed originals for a duplicate candidate.
//!
//! The exact base-name file (`report.pdf` for `report-3.pdf`) is tried
//! first. After it come the other regular files in the same directory whose
//! names start with the base stem (`report-1.pdf`, `report-2.pdf`, ...), in
//! lexicographic order so results do not depend on the platform's directory
//! listing order.

use std::fs;
use std::path::{Path, PathBuf};

use super::pattern::base_name;

/// List the files `candidate` may be a duplicate of, most likely first.
///
/// Missing or unreadable directories yield an empty list.
#[must_use]
pub fn gather_originals(candidate: &Path) -> Vec<PathBuf> {
    let Some(filename) = candidate.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let dir = candidate.parent().unwrap_or_else(|| Path::new("."));

    let base = base_name(filename);
    let stem = base.rsplit_once('.').map_or(base.as_str(), |(stem, _)| stem);
    log::debug!("Looking for original files with base name: {}", base);

    let mut originals = Vec::new();
    let exact = dir.join(&base);
    if base != filename && exact.is_file() {
        originals.push(exact);
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot list {}: {}", dir.display(), e);
            return originals;
        }
    };

    let mut siblings: Vec<(String, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let is_sibling = name != filename && name != base && name.starts_with(stem);
            (is_sibling && entry.path().is_file()).then(|| (name, entry.path()))
        })
        .collect();
    siblings.sort();
    originals.extend(siblings.into_iter().map(|(_, path)| path));

    log::debug!("Found {} candidate files to compare", originals.len());
    originals
}
