//! Where a quarantined file lands.
//!
//! Destinations are `<root>/<YYYY-MM-DD>/<relative>/<filename>`. The
//! relative part keeps enough of the source location to tell files from
//! different folders apart, chosen in this order:
//!
//! 1. Under a watched folder: the watched folder's name plus the path below it
//! 2. Below a known cloud-sync folder name: everything from that folder on
//! 3. Under the home directory: the path relative to home
//! 4. Otherwise nothing, and the file goes straight into the date folder
//!
//! The cloud-folder rule is a placement hint only; odd folder names can fool it.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Folder names of common sync clients.
pub const CLOUD_FOLDERS: [&str; 4] = ["Dropbox", "OneDrive", "Google Drive", "iCloud Drive"];

/// Compute the directory structure to preserve for `file` inside the date folder.
///
/// Returns `None` when no rule applies or the file sits directly in the home
/// directory.
#[must_use]
pub fn relative_path(file: &Path, watched: &[PathBuf], home: Option<&Path>) -> Option<PathBuf> {
    let parent = file.parent()?;

    for folder in watched {
        if let Ok(below) = parent.strip_prefix(folder) {
            let mut rel = folder
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_default();
            if !below.as_os_str().is_empty() {
                rel.push(below);
            }
            return (!rel.as_os_str().is_empty()).then_some(rel);
        }
    }

    let components: Vec<Component<'_>> = parent.components().collect();
    if let Some(idx) = components
        .iter()
        .position(|c| matches!(c, Component::Normal(name) if is_cloud_folder(name)))
    {
        return Some(components[idx..].iter().collect());
    }

    if let Some(home) = home {
        if let Ok(below) = parent.strip_prefix(home) {
            return (!below.as_os_str().is_empty()).then(|| below.to_path_buf());
        }
    }

    None
}

fn is_cloud_folder(name: &OsStr) -> bool {
    CLOUD_FOLDERS.iter().any(|cloud| name == *cloud)
}

/// Pick a free path for `filename` inside `dir`.
///
/// If `dir/filename` is taken, `_1`, `_2`, ... is inserted before the
/// extension until a free name is found.
#[must_use]
pub fn unique_destination(dir: &Path, filename: &str) -> PathBuf {
    let first = dir.join(filename);
    if !exists(&first) {
        return first;
    }

    let (stem, ext) = split_extension(filename);
    (1u64..)
        .map(|n| dir.join(format!("{stem}_{n}{ext}")))
        .find(|candidate| !exists(candidate))
        .unwrap_or(first)
}

/// Split `name` into stem and extension (with its dot), like `os.path.splitext`.
///
/// A leading dot does not start an extension, so `.bashrc` has none.
#[must_use]
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].trim_start_matches('.').is_empty() => (name, ""),
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    }
}

fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
