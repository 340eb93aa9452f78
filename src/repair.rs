//! Run orchestration: scan, detect markers, delete, sanitize solutions and
//! projects, strictly in that order.

use crate::catalog::{list_files, FileRecord};
use crate::error::{ItemFailure, RepairError, Result};
use crate::markers::{dir_names, find_markers, predict_emptied, remove_markers, EmptiedDirs};
use crate::project::{inspect_file, ProjectVerdict};
use crate::rules::Rules;
use crate::solution::sanitize_file;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options controlling a run (runtime flags)
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Mutate the file system. When false every stage only counts.
    pub apply: bool,
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scan,
    DetectMarkers,
    DeleteMarkers,
    SanitizeSolutions,
    SanitizeProjects,
    Done,
}

/// Classification of one project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectStatus {
    Valid,
    Invalid {
        offending: Vec<String>,
        repaired: bool,
    },
    /// Not well-formed markup; skipped.
    Unreadable(String),
}

impl ProjectStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Valid => "valid",
            ProjectStatus::Invalid { .. } => "invalid",
            ProjectStatus::Unreadable(_) => "unreadable",
        }
    }
}

#[derive(Debug, Default)]
pub struct MarkerStage {
    pub found: Vec<PathBuf>,
    pub deleted: usize,
    /// Folders removed, or in simulation the folders that would be.
    pub emptied_dirs: Vec<PathBuf>,
    pub emptied_names: EmptiedDirs,
}

#[derive(Debug, Default)]
pub struct SolutionStage {
    pub found: usize,
    /// Solutions rewritten, or in simulation the ones that would be.
    pub modified: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ProjectStage {
    pub results: Vec<(PathBuf, ProjectStatus)>,
}

impl ProjectStage {
    pub fn count(&self, label: &str) -> usize {
        self.results
            .iter()
            .filter(|(_, status)| status.label() == label)
            .count()
    }
}

/// Everything a run found and did.
#[derive(Debug, Default)]
pub struct RunReport {
    pub root: PathBuf,
    pub applied: bool,
    pub files_scanned: usize,
    pub markers: MarkerStage,
    pub solutions: SolutionStage,
    pub projects: ProjectStage,
    pub failures: Vec<ItemFailure>,
}

impl RunReport {
    /// True when the run changed (or would change) nothing.
    pub fn is_clean(&self) -> bool {
        self.markers.found.is_empty()
            && self.markers.emptied_dirs.is_empty()
            && self.solutions.modified.is_empty()
            && self.projects.count("invalid") == 0
    }
}

/// Receives progress as the run moves through its stages.
pub trait RunObserver {
    fn stage_started(&mut self, _stage: Stage) {}
    fn stage_finished(&mut self, _stage: Stage, _report: &RunReport) {}
    fn project_checked(&mut self, _path: &Path, _status: &ProjectStatus) {}
}

impl RunObserver for () {}

/// Run the whole pipeline over `root`.
///
/// Only a bad root aborts the run; per-item failures end up in
/// [`RunReport::failures`].
pub fn run(
    root: &Path,
    rules: &Rules,
    options: RunOptions,
    observer: &mut dyn RunObserver,
) -> Result<RunReport> {
    let mut report = RunReport {
        root: root.to_path_buf(),
        applied: options.apply,
        ..RunReport::default()
    };

    observer.stage_started(Stage::Scan);
    let files = list_files(root)?;
    report.files_scanned = files.len();
    observer.stage_finished(Stage::Scan, &report);

    observer.stage_started(Stage::DetectMarkers);
    let markers = find_markers(&files, rules);
    report.markers.found = markers.iter().map(|m| m.path.clone()).collect();
    observer.stage_finished(Stage::DetectMarkers, &report);

    if options.apply {
        observer.stage_started(Stage::DeleteMarkers);
        let removal = remove_markers(&markers);
        report.markers.deleted = removal.files_deleted;
        report.markers.emptied_dirs = removal.dirs_deleted;
        report.markers.emptied_names = removal.emptied;
        report.failures.extend(removal.failures);
        observer.stage_finished(Stage::DeleteMarkers, &report);
    } else {
        report.markers.emptied_dirs = predict_emptied(&markers, rules);
        report.markers.emptied_names = dir_names(&report.markers.emptied_dirs);
    }

    // Marker files are gone (or about to be); never treat them as solutions or projects.
    let survivors: Vec<&FileRecord> = files
        .iter()
        .filter(|f| !rules.is_marker_name(&f.name))
        .collect();

    observer.stage_started(Stage::SanitizeSolutions);
    sanitize_solutions(&survivors, rules, options, &mut report);
    observer.stage_finished(Stage::SanitizeSolutions, &report);

    observer.stage_started(Stage::SanitizeProjects);
    sanitize_projects(&survivors, rules, options, &mut report, observer);
    observer.stage_finished(Stage::SanitizeProjects, &report);

    observer.stage_finished(Stage::Done, &report);
    Ok(report)
}

fn sanitize_solutions(
    files: &[&FileRecord],
    rules: &Rules,
    options: RunOptions,
    report: &mut RunReport,
) {
    let solutions: Vec<_> = files
        .iter()
        .filter(|f| rules.is_solution_name(&f.name))
        .collect();
    report.solutions.found = solutions.len();

    for sln in solutions {
        match sanitize_file(&sln.path, &report.markers.emptied_names, options.apply) {
            Ok(outcome) if outcome.changed => {
                debug!(
                    "{} drops {} lines",
                    sln.path.display(),
                    outcome.lines_removed
                );
                report.solutions.modified.push(sln.path.clone());
            }
            Ok(_) => {}
            Err(err) => {
                warn!("{}", err);
                report.failures.push(ItemFailure::from(&err));
            }
        }
    }
}

fn sanitize_projects(
    files: &[&FileRecord],
    rules: &Rules,
    options: RunOptions,
    report: &mut RunReport,
    observer: &mut dyn RunObserver,
) {
    for project in files.iter().filter(|f| rules.is_project_name(&f.name)) {
        let status = match inspect_file(&project.path, rules, options.apply) {
            Ok(ProjectVerdict::Valid) => ProjectStatus::Valid,
            Ok(ProjectVerdict::Invalid {
                offending,
                repaired,
            }) => ProjectStatus::Invalid {
                offending,
                repaired,
            },
            Err(err @ RepairError::Parse { .. }) => {
                warn!("{}", err);
                ProjectStatus::Unreadable(err.to_string())
            }
            Err(err) => {
                warn!("{}", err);
                report.failures.push(ItemFailure::from(&err));
                continue;
            }
        };
        observer.project_checked(&project.path, &status);
        report.projects.results.push((project.path.clone(), status));
    }
}
