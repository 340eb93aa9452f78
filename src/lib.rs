//! nuget-repair - Remove leftover NuGet package-restore artifacts
//!
//! Older Visual Studio solutions restored packages through a `.nuget` folder
//! (`NuGet.exe`, `NuGet.Config`, `NuGet.targets`) referenced from the solution
//! file and imported by every project. nuget-repair finds those leftovers under
//! a folder and, unless simulating, removes them:
//!
//! 1. marker files whose name contains `nuget.` are deleted, then any folder
//!    they leave empty;
//! 2. solution files drop the project blocks naming an emptied folder;
//! 3. project files drop `<Import Project="...nuget.targets">` and
//!    `<Target Name="...NuGet...">` elements.
//!
//! The detection tokens live in `rules.toml`, compiled into the binary.

pub mod catalog;
pub mod error;
pub mod markers;
pub mod project;
pub mod repair;
pub mod rules;
pub mod solution;

// Re-export commonly used items
pub use catalog::{list_files, FileRecord};
pub use error::{ItemFailure, RepairError, Result};
pub use markers::{find_markers, predict_emptied, remove_markers, EmptiedDirs, MarkerRemoval};
pub use project::{inspect_file, Inspection, NodeId, ProjectDocument, ProjectVerdict};
pub use repair::{run, ProjectStatus, RunObserver, RunOptions, RunReport, Stage};
pub use rules::{OffendingPattern, Rules};
pub use solution::{sanitize_file, sanitize_lines, sanitize_text, SolutionOutcome};
