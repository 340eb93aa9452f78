//! Error types shared by the repair stages.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for repair operations.
pub type Result<T> = std::result::Result<T, RepairError>;

#[derive(Error, Debug)]
pub enum RepairError {
    /// The root folder does not exist or is not a directory. Fatal.
    #[error("Directory {} not found.", path.display())]
    NotFound { path: PathBuf },

    /// A read, write or delete failed on a single file or directory.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A project file is not well-formed markup.
    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The embedded rule table could not be read.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RepairError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        RepairError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn parse(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        RepairError::Parse {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }
}

/// A non-fatal failure recorded against one item during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub message: String,
}

impl From<&RepairError> for ItemFailure {
    fn from(err: &RepairError) -> Self {
        let path = match err {
            RepairError::NotFound { path }
            | RepairError::Io { path, .. }
            | RepairError::Parse { path, .. } => path.clone(),
            RepairError::Config(_) => PathBuf::new(),
        };
        ItemFailure {
            path,
            message: err.to_string(),
        }
    }
}
