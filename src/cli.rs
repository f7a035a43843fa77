//! Command-line front-end for trieur.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing with clap
//! - Merging command-line overrides into the saved settings
//! - Sort, dry-run and restore orchestration with progress display

use crate::config::Settings;
use crate::ledger::MoveLedger;
use crate::output::OutputFormatter;
use crate::sorter::SortEngine;
use crate::undo::RestoreEngine;
use clap::{ArgAction, Parser};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Sort the files of a directory into folders, and put them back.
#[derive(Debug, Clone, Parser)]
#[command(name = "trieur", version, about)]
pub struct Cli {
    /// Directory to sort (defaults to the source directory of the settings file)
    pub directory: Option<PathBuf>,

    /// Sort mode: type, date or taille
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Do not create one sub-folder per extension in type mode
    #[arg(long)]
    pub no_subfolders: bool,

    /// Restore the layout recorded by the previous sort
    #[arg(long, conflicts_with = "dry_run")]
    pub restore: bool,

    /// Show where files would go without moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Settings file (JSON, or TOML with a .toml extension)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    pub save_config: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Sort files in a directory.
    Sort {
        /// If true, simulate the operation without making changes.
        dry_run: bool,
    },
    /// Restore the previous sort.
    Restore,
}

impl Cli {
    pub fn command(&self) -> OrganizeCommand {
        if self.restore {
            OrganizeCommand::Restore
        } else {
            OrganizeCommand::Sort {
                dry_run: self.dry_run,
            }
        }
    }

    /// Loads the settings and applies the command-line overrides.
    pub fn settings(&self) -> Result<Settings, String> {
        let mut settings = match &self.config {
            // --save-config may create the file
            Some(path) if self.save_config && !path.exists() => Settings::default(),
            path => Settings::load(path.as_deref())
                .map_err(|e| format!("Error loading configuration: {}", e))?,
        };

        if let Some(directory) = &self.directory {
            settings.dossier_source = directory.to_string_lossy().into_owned();
        }
        if let Some(mode) = &self.mode {
            settings.type_tri = mode.clone();
        }
        if self.no_subfolders {
            settings.sous_dossiers_par_extension = false;
        }
        Ok(settings)
    }
}

/// Runs the CLI application.
///
/// Returns `Ok(true)` when the run reported no errors, `Ok(false)` when it
/// completed with errors, and `Err` when it could not start at all.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use trieur::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["trieur", "/path/to/directory", "--dry-run"]);
/// match run_cli(&cli) {
///     Ok(clean) => println!("Done (clean: {})", clean),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<bool, String> {
    let settings = cli.settings()?;

    if cli.save_config {
        let path = cli
            .config
            .clone()
            .or_else(Settings::default_path)
            .ok_or_else(|| "No settings path available (HOME is not set)".to_string())?;
        settings
            .save(&path)
            .map_err(|e| format!("Error saving configuration: {}", e))?;
        OutputFormatter::success(&format!("Settings saved to {}", path.display()));
    }

    if settings.dossier_source.is_empty() {
        return Err("No source directory given".to_string());
    }

    match cli.command() {
        OrganizeCommand::Sort { dry_run: true } => dry_run(&settings),
        OrganizeCommand::Sort { dry_run: false } => sort_directory(&settings),
        OrganizeCommand::Restore => restore_directory(&settings),
    }
}

fn sort_directory(settings: &Settings) -> Result<bool, String> {
    let config = settings.to_sort_config();
    let source = &config.source_directory;
    OutputFormatter::info(&format!(
        "Sorting contents of {} by {}",
        source.display(),
        config.mode
    ));

    let pb = OutputFormatter::create_progress_bar();
    let report = {
        let mut update = OutputFormatter::progress_callback(&pb);
        SortEngine::new(&config).run(Some(&mut update))
    };
    pb.finish_and_clear();

    print_errors(&report.errors);

    if report.is_aborted() {
        OutputFormatter::error("Sort aborted; every change made by this run was rolled back.");
        return Ok(false);
    }

    if report.processed > 0 {
        if let Ok(ledger) = MoveLedger::load(source) {
            let mut counts = BTreeMap::new();
            for (destination, _) in ledger.iter() {
                *counts.entry(top_level_folder(source, &destination)).or_insert(0) += 1;
            }
            OutputFormatter::summary_table(&counts, report.processed);
        }
        OutputFormatter::success(&format!("{} file(s) sorted.", report.processed));
        OutputFormatter::plain(&format!(
            "Use 'trieur {} --restore' to revert changes.",
            source.display()
        ));
    }

    Ok(report.errors.is_empty())
}

fn dry_run(settings: &Settings) -> Result<bool, String> {
    let config = settings.to_sort_config();
    let source = &config.source_directory;
    OutputFormatter::dry_run_notice(&format!("Analyzing contents of {}", source.display()));

    let planned = SortEngine::new(&config)
        .preview()
        .map_err(|e| e.to_string())?;

    if planned.is_empty() {
        OutputFormatter::plain("No files found to sort.");
        return Ok(true);
    }

    let mut counts = BTreeMap::new();
    for planned_move in &planned {
        let name = planned_move
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relative = planned_move
            .destination_dir
            .strip_prefix(source)
            .unwrap_or(&planned_move.destination_dir);
        OutputFormatter::plain(&format!(" - {}", name));
        OutputFormatter::plain(&format!("   → Would move to {}/", relative.display()));
        *counts
            .entry(top_level_folder(source, &planned_move.destination_dir))
            .or_insert(0) += 1;
    }

    OutputFormatter::summary_table(&counts, planned.len());
    OutputFormatter::success("Dry run complete. No files were modified.");
    Ok(true)
}

fn restore_directory(settings: &Settings) -> Result<bool, String> {
    let config = settings.to_sort_config();
    OutputFormatter::info(&format!(
        "Restoring contents of {}",
        config.source_directory.display()
    ));

    let pb = OutputFormatter::create_progress_bar();
    let report = {
        let mut update = OutputFormatter::progress_callback(&pb);
        RestoreEngine::new(&config).run(Some(&mut update))
    };
    pb.finish_and_clear();

    print_errors(&report.errors);
    for kept in &report.set_aside {
        OutputFormatter::warning(&format!(
            "A file was in the way and has been kept as {}",
            kept.display()
        ));
    }
    if report.restored > 0 {
        OutputFormatter::success(&format!("{} file(s) restored.", report.restored));
    }
    Ok(report.is_complete_success())
}

fn print_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    OutputFormatter::header("ERRORS");
    for error in errors {
        OutputFormatter::error(error);
    }
}

/// First path component of `path` below `source`.
fn top_level_folder(source: &Path, path: &Path) -> String {
    path.strip_prefix(source)
        .ok()
        .and_then(|rel| rel.components().next())
        .and_then(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .unwrap_or_else(|| path.display().to_string())
}
