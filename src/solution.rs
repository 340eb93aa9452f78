//! Removal of project blocks from solution files.
//!
//! A solution lists its projects as blocks:
//!
//! ```text
//! Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = ".nuget", ".nuget", "{...}"
//! 	ProjectSection(SolutionItems) = preProject
//! 		.nuget\NuGet.exe = .nuget\NuGet.exe
//! 	EndProjectSection
//! EndProject
//! ```
//!
//! Any block whose opening line mentions an emptied folder name is dropped as a
//! whole, boundary lines included.

use crate::error::{RepairError, Result};
use crate::markers::EmptiedDirs;
use std::fs;
use std::path::Path;
use tracing::debug;

const BLOCK_START: &str = "Project";
const BLOCK_END: &str = "EndProject";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Keeping,
    Skipping,
}

impl BlockState {
    /// Advance over one line. Returns the next state and whether to emit the line.
    fn step(self, line: &str, emptied: &EmptiedDirs) -> (BlockState, bool) {
        match self {
            BlockState::Keeping => {
                // Substring match, case-sensitive against the line as written.
                let drop = line.starts_with(BLOCK_START)
                    && emptied.iter().any(|name| line.contains(name.as_str()));
                if drop {
                    (BlockState::Skipping, false)
                } else {
                    (BlockState::Keeping, true)
                }
            }
            BlockState::Skipping if line.starts_with(BLOCK_END) => (BlockState::Keeping, false),
            BlockState::Skipping => (BlockState::Skipping, false),
        }
    }
}

/// Drop every project block that references an emptied folder.
///
/// A block that is never closed swallows everything up to end of input.
pub fn sanitize_lines<'a, I>(lines: I, emptied: &EmptiedDirs) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut state = BlockState::Keeping;
    let mut kept = Vec::new();
    for line in lines {
        let (next, emit) = state.step(line, emptied);
        if emit {
            kept.push(line);
        }
        state = next;
    }
    kept
}

/// Line-terminator preserving variant of [`sanitize_lines`] over whole text.
pub fn sanitize_text(text: &str, emptied: &EmptiedDirs) -> String {
    if emptied.is_empty() {
        return text.to_string();
    }
    sanitize_lines(text.split_inclusive('\n'), emptied).concat()
}

/// Result of inspecting one solution file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolutionOutcome {
    pub changed: bool,
    pub lines_removed: usize,
}

/// Sanitize a solution file, writing it back only when `apply` is set and the
/// text actually changed.
pub fn sanitize_file(path: &Path, emptied: &EmptiedDirs, apply: bool) -> Result<SolutionOutcome> {
    let original = fs::read_to_string(path).map_err(|e| RepairError::io(path, e))?;
    let cleaned = sanitize_text(&original, emptied);

    let outcome = SolutionOutcome {
        changed: cleaned != original,
        lines_removed: original
            .split_inclusive('\n')
            .count()
            .saturating_sub(cleaned.split_inclusive('\n').count()),
    };

    if outcome.changed && apply {
        fs::write(path, cleaned).map_err(|e| RepairError::io(path, e))?;
        debug!(
            "Rewrote {} ({} lines removed)",
            path.display(),
            outcome.lines_removed
        );
    }

    Ok(outcome)
}
