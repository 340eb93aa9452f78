//! Recursive file enumeration under the root folder.

use crate::error::{RepairError, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file seen during the scan. Snapshot only; nothing keeps it in sync with disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    pub parent: PathBuf,
}

impl FileRecord {
    pub fn new(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        FileRecord {
            path: path.to_path_buf(),
            name,
            parent,
        }
    }
}

/// List every file below `root`, each exactly once.
///
/// Hidden files and ignore files are not honoured: a `.nuget` folder is exactly
/// what we are looking for. Entries that cannot be read are logged and skipped.
pub fn list_files(root: &Path) -> Result<Vec<FileRecord>> {
    if !root.is_dir() {
        return Err(RepairError::NotFound {
            path: root.to_path_buf(),
        });
    }

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .parents(false)
        .git_ignore(false)
        .ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Failed to access entry in {}: {}", root.display(), err);
                continue;
            }
        };

        if entry.file_type().is_some_and(|ft| ft.is_file()) {
            debug!("Found file {}", entry.path().display());
            files.push(FileRecord::new(entry.path()));
        }
    }

    Ok(files)
}
