use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use nuget_repair::{run, ProjectStatus, RunObserver, RunOptions, RunReport, Rules, Stage};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Find and optionally remove leftover NuGet package-restore files and references",
    long_about = None
)]
struct Args {
    /// The folder where the solution(s) reside in
    #[arg(long, short)]
    folder: PathBuf,

    /// Only report what would change; no files are touched
    #[arg(long, short)]
    simulate: bool,

    /// Print the application header
    #[arg(long, short)]
    logo: bool,

    /// Show diagnostic output for every file visited and changed
    #[arg(long, short)]
    verbose: bool,
}

/// Prints each stage to the console as the run progresses.
struct ConsoleObserver {
    simulate: bool,
}

impl ConsoleObserver {
    fn prefix(text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }
}

impl RunObserver for ConsoleObserver {
    fn stage_started(&mut self, stage: Stage) {
        match stage {
            Stage::Scan => Self::prefix("Scanning files..."),
            Stage::DetectMarkers => Self::prefix("Searching for unnecessary NuGet files..."),
            Stage::DeleteMarkers => Self::prefix("Deleting files..."),
            Stage::SanitizeSolutions => Self::prefix("Checking solution files..."),
            Stage::SanitizeProjects => println!("Inspecting project files..."),
            Stage::Done => {}
        }
    }

    fn stage_finished(&mut self, stage: Stage, report: &RunReport) {
        match stage {
            Stage::Scan => {
                println!("{} found.", report.files_scanned.to_string().green());
            }
            Stage::DetectMarkers => {
                println!(
                    "{} found.",
                    report.markers.found.len().to_string().magenta()
                );
            }
            Stage::DeleteMarkers => {
                println!(
                    "{}",
                    format!("Done. ({} files deleted.)", report.markers.deleted).green()
                );
                println!(
                    "Deleting folders...{}",
                    format!(
                        "Done. ({} folders deleted.)",
                        report.markers.emptied_dirs.len()
                    )
                    .green()
                );
            }
            Stage::SanitizeSolutions => {
                let verb = if self.simulate {
                    "would be modified"
                } else {
                    "modified"
                };
                println!(
                    "{} found, {}",
                    report.solutions.found.to_string().magenta(),
                    format!("{} {}.", report.solutions.modified.len(), verb).green()
                );
                if self.simulate {
                    for dir in &report.markers.emptied_dirs {
                        println!("  Would delete folder: {}", dir.display());
                    }
                }
                for sln in &report.solutions.modified {
                    println!("  - {}", sln.display());
                }
            }
            Stage::SanitizeProjects => {
                let projects = &report.projects;
                println!(
                    "{} project files: {} valid, {} invalid, {} unreadable.",
                    projects.results.len().to_string().magenta(),
                    projects.count("valid"),
                    projects.count("invalid"),
                    projects.count("unreadable")
                );
            }
            Stage::Done => {}
        }
    }

    fn project_checked(&mut self, path: &Path, status: &ProjectStatus) {
        print!("  Inspecting {}...", path.display());
        match status {
            ProjectStatus::Valid => println!("{}", "valid.".green()),
            ProjectStatus::Invalid {
                offending,
                repaired,
            } => {
                let suffix = if *repaired { " (repaired)" } else { "" };
                println!("{}{}", "invalid.".magenta(), suffix);
                for element in offending {
                    println!("    {}", element);
                }
            }
            ProjectStatus::Unreadable(message) => {
                println!("{} {}", "unreadable.".red(), message);
            }
        }
    }
}

fn print_logo() {
    println!(
        "{}",
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")).bold()
    );
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
    println!();
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.logo {
        print_logo();
    }
    if args.simulate {
        println!("{}", "!!! SIMULATION MODE !!!".green());
    }

    if !args.folder.is_dir() {
        bail!("Directory {} not found.", args.folder.display());
    }
    let root = args
        .folder
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", args.folder.display()))?;
    println!("Directory: {}", root.display().to_string().green());

    let rules = Rules::load().context("Failed to load detection rules")?;
    let mut observer = ConsoleObserver {
        simulate: args.simulate,
    };
    let options = RunOptions {
        apply: !args.simulate,
    };
    let report = run(&root, &rules, options, &mut observer)?;

    if !report.failures.is_empty() {
        println!(
            "{}",
            format!("{} operations failed:", report.failures.len()).red()
        );
        for failure in &report.failures {
            println!("  {}", failure.message.red());
        }
    }

    if args.simulate {
        println!(
            "{}",
            "SIM-MODE: NO CHANGES WERE MADE TO ANY OF THE ELEMENTS!".green()
        );
    } else if report.is_clean() {
        println!("{}", "Nothing to repair.".green());
    }
    println!("\n{}", "Finished.".cyan());

    Ok(())
}
