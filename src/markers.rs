//! Marker file detection and removal.
//!
//! Marker files are leftovers of the old solution-level package restore
//! (`.nuget/NuGet.exe`, `NuGet.Config`, `NuGet.targets`). Removing them can
//! leave their folder empty; those folders are removed too and their names are
//! handed on so solution files can drop the matching project entries.

use crate::catalog::FileRecord;
use crate::error::{ItemFailure, RepairError};
use crate::rules::Rules;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lowercased names (not paths) of directories emptied by marker removal.
///
/// Matching later happens by bare name, so two folders called `.nuget` in
/// different parts of the tree are indistinguishable.
pub type EmptiedDirs = BTreeSet<String>;

/// Outcome of deleting marker files.
#[derive(Debug, Default)]
pub struct MarkerRemoval {
    pub files_deleted: usize,
    pub dirs_deleted: Vec<PathBuf>,
    pub emptied: EmptiedDirs,
    pub failures: Vec<ItemFailure>,
}

/// Select the files whose name contains a marker token.
pub fn find_markers(files: &[FileRecord], rules: &Rules) -> Vec<FileRecord> {
    files
        .iter()
        .filter(|f| rules.is_marker_name(&f.name))
        .cloned()
        .collect()
}

/// Delete every marker, then every parent folder left with no entries.
///
/// Best effort: a failed delete is recorded and the loop moves on.
pub fn remove_markers(markers: &[FileRecord]) -> MarkerRemoval {
    let mut outcome = MarkerRemoval::default();

    for marker in markers {
        match fs::remove_file(&marker.path) {
            Ok(()) => {
                debug!("Removed {}", marker.path.display());
                outcome.files_deleted += 1;
            }
            Err(err) => {
                let err = RepairError::io(&marker.path, err);
                warn!("{}", err);
                outcome.failures.push(ItemFailure::from(&err));
            }
        }
    }

    for parent in unique_parents(markers) {
        if !parent.is_dir() || !is_empty_dir(&parent) {
            continue;
        }
        match fs::remove_dir(&parent) {
            Ok(()) => {
                debug!("Removed directory {}", parent.display());
                if let Some(name) = dir_name(&parent) {
                    outcome.emptied.insert(name);
                }
                outcome.dirs_deleted.push(parent);
            }
            Err(err) => {
                let err = RepairError::io(&parent, err);
                warn!("{}", err);
                outcome.failures.push(ItemFailure::from(&err));
            }
        }
    }

    outcome
}

/// Directories that `remove_markers` would empty, without touching anything.
///
/// A folder qualifies when every entry in it is a marker file.
pub fn predict_emptied(markers: &[FileRecord], rules: &Rules) -> Vec<PathBuf> {
    unique_parents(markers)
        .into_iter()
        .filter(|parent| holds_only_markers(parent, rules))
        .collect()
}

/// Lowercased bare names of the given directories.
pub fn dir_names(dirs: &[PathBuf]) -> EmptiedDirs {
    dirs.iter().filter_map(|d| dir_name(d)).collect()
}

fn unique_parents(markers: &[FileRecord]) -> BTreeSet<PathBuf> {
    markers
        .iter()
        .filter(|m| !m.parent.as_os_str().is_empty())
        .map(|m| m.parent.clone())
        .collect()
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
}

fn is_empty_dir(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(err) => {
            warn!("Failed to read directory {}: {}", path.display(), err);
            false
        }
    }
}

fn holds_only_markers(path: &Path, rules: &Rules) -> bool {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Failed to read directory {}: {}", path.display(), err);
            return false;
        }
    };

    let mut seen_any = false;
    for entry in entries {
        let Ok(entry) = entry else {
            return false;
        };
        let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
        if !is_file || !rules.is_marker_path(&entry.path()) {
            return false;
        }
        seen_any = true;
    }
    seen_any
}
