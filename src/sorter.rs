//! The sort engine: one pass over the top-level files of a directory.
//!
//! A run goes through `Validating → Listing → PerFileLoop → Finalizing` and
//! ends either `Completed` or `Aborted`. Per-file trouble (a failed stat, a
//! file that vanished) is logged and the loop continues; structural failures
//! from the mover (permission, disk space, directory creation) roll back the
//! whole run and stop it. The move ledger is kept in memory during the loop
//! and written once at the end.

use crate::config::{SortConfig, SortMode};
use crate::destination::{Resolution, SkipReason, resolve};
use crate::diagnostics::{DiagnosticsSink, TracingSink};
use crate::error::{TrieurError, TrieurResult};
use crate::file_organizer::{Mover, SafeMover, unique_destination};
use crate::ledger::{LEDGER_FILE_NAME, MoveLedger};
use crate::progress::{Progress, ProgressFn};
use crate::rollback::{RollbackLog, rollback};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// Terminal state of a sort run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Stopped by a structural error; everything the run did was rolled back.
    Aborted,
}

/// What a sort run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortReport {
    /// Files moved and still in place at the end of the run.
    pub processed: usize,
    /// Human-readable errors, in the order they happened.
    pub errors: Vec<String>,
    pub status: RunStatus,
}

impl SortReport {
    fn new(processed: usize, errors: Vec<String>, status: RunStatus) -> Self {
        Self {
            processed,
            errors,
            status,
        }
    }

    /// `(processed, errors)`, the shape front-ends display.
    pub fn into_parts(self) -> (usize, Vec<String>) {
        (self.processed, self.errors)
    }

    pub fn is_aborted(&self) -> bool {
        self.status == RunStatus::Aborted
    }
}

/// A move the engine would perform, as reported by a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination_dir: PathBuf,
}

/// Sorts the files of one source directory.
pub struct SortEngine<'a, M: Mover = SafeMover> {
    config: Cow<'a, SortConfig>,
    mover: M,
    sink: &'a dyn DiagnosticsSink,
}

impl<'a> SortEngine<'a, SafeMover> {
    pub fn new(config: &'a SortConfig) -> Self {
        Self {
            config: config.absolutized(),
            mover: SafeMover,
            sink: &TracingSink,
        }
    }
}

impl<'a, M: Mover> SortEngine<'a, M> {
    pub fn with_sink(mut self, sink: &'a dyn DiagnosticsSink) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the mover, e.g. to inject failures in tests.
    pub fn with_mover<N: Mover>(self, mover: N) -> SortEngine<'a, N> {
        SortEngine {
            config: self.config,
            mover,
            sink: self.sink,
        }
    }

    /// Runs the sort. Never panics on I/O trouble; everything ends up in the report.
    pub fn run(&mut self, progress: Option<ProgressFn<'_>>) -> SortReport {
        let mut progress = Progress::new(progress);
        let source = &self.config.source_directory;
        self.sink.info(&format!(
            "Sorting {} by {}",
            source.display(),
            self.config.mode
        ));

        // Validating
        if !source.is_dir() {
            let error = TrieurError::InvalidSourceDirectory(source.clone());
            self.sink.error(&error.to_string());
            return SortReport::new(0, vec![error.to_string()], RunStatus::Aborted);
        }

        // Listing
        let candidates = match list_candidates(source, self.sink) {
            Ok(candidates) => candidates,
            Err(error) => {
                self.sink.error(&error.to_string());
                return SortReport::new(0, vec![error.to_string()], RunStatus::Aborted);
            }
        };
        if candidates.is_empty() {
            let error = TrieurError::NoFilesFound(source.clone());
            self.sink.info(&error.to_string());
            progress.report(0, 0);
            return SortReport::new(0, vec![error.to_string()], RunStatus::Completed);
        }

        // PerFileLoop
        let total = candidates.len();
        let mut ledger = MoveLedger::new();
        let mut log = RollbackLog::new();
        let mut errors = Vec::new();
        let mut processed = 0;
        let mut bad_mode_reported = false;
        let mut status = RunStatus::Completed;

        for (index, path) in candidates.iter().enumerate() {
            let Some(file_name) = path.file_name() else {
                continue;
            };

            let destination_dir = match resolve(path, &self.config) {
                Resolution::Directory(dir) => dir,
                Resolution::Skip(SkipReason::StatFailed(reason)) => {
                    self.sink
                        .warn(&format!("Skipping {}: {}", path.display(), reason));
                    progress.report(index + 1, total);
                    continue;
                }
                Resolution::Skip(SkipReason::BadMode(raw)) => {
                    if !bad_mode_reported {
                        let error = TrieurError::BadSortMode(raw);
                        self.sink.error(&error.to_string());
                        errors.push(error.to_string());
                        bad_mode_reported = true;
                    }
                    progress.report(index + 1, total);
                    continue;
                }
            };

            let destination = unique_destination(&destination_dir, file_name);
            let final_name = destination
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| file_name.to_os_string());
            // Unrecordable files are never moved.
            if let Err(error) = ledger.insert(&destination, path) {
                self.sink.warn(&error.to_string());
                errors.push(error.to_string());
                progress.report(index + 1, total);
                continue;
            }

            match self
                .mover
                .move_file(path, &destination_dir, &final_name, &mut log)
            {
                Ok(moved) => {
                    if moved != destination {
                        ledger.evict(&destination);
                        if let Err(error) = ledger.insert(&moved, path) {
                            self.sink.error(&error.to_string());
                            errors.push(error.to_string());
                        }
                    }
                    processed += 1;
                    self.sink.info(&format!(
                        "Moved {} to {}",
                        path.display(),
                        moved.display()
                    ));
                    progress.report(index + 1, total);
                }
                Err(error) if error.aborts_run() => {
                    ledger.evict(&destination);
                    self.sink.error(&error.to_string());
                    errors.push(error.to_string());
                    errors.extend(rollback(&mut log, self.sink));
                    processed = 0;
                    status = RunStatus::Aborted;
                    break;
                }
                Err(error) => {
                    ledger.evict(&destination);
                    self.sink.warn(&error.to_string());
                    errors.push(error.to_string());
                    progress.report(index + 1, total);
                }
            }
        }

        // Finalizing
        if status == RunStatus::Completed && processed > 0 {
            match ledger.save(source) {
                Ok(()) => self.sink.info(&format!(
                    "Saved {} entries to {}",
                    ledger.len(),
                    MoveLedger::path_for(source).display()
                )),
                Err(error) => {
                    self.sink.error(&error.to_string());
                    errors.push(error.to_string());
                }
            }
        }
        log.clear();

        SortReport::new(processed, errors, status)
    }

    /// Dry run: where each candidate would go, without moving anything.
    pub fn preview(&self) -> TrieurResult<Vec<PlannedMove>> {
        let source = &self.config.source_directory;
        if !source.is_dir() {
            return Err(TrieurError::InvalidSourceDirectory(source.clone()));
        }
        if let SortMode::Unrecognized(raw) = &self.config.mode {
            return Err(TrieurError::BadSortMode(raw.clone()));
        }

        let mut planned = Vec::new();
        for path in list_candidates(source, self.sink)? {
            match resolve(&path, &self.config) {
                Resolution::Directory(destination_dir) => planned.push(PlannedMove {
                    source: path,
                    destination_dir,
                }),
                Resolution::Skip(reason) => self
                    .sink
                    .debug(&format!("Would skip {}: {:?}", path.display(), reason)),
            }
        }
        Ok(planned)
    }
}

/// Sorts `config.source_directory` with the production mover, logging through `tracing`.
pub fn sort(config: &SortConfig, progress: Option<ProgressFn<'_>>) -> SortReport {
    SortEngine::new(config).run(progress)
}

/// Regular, non-hidden top-level files of `source`, ordered by name.
/// Entries that cannot be read are reported to `sink` and left out.
fn list_candidates(source: &Path, sink: &dyn DiagnosticsSink) -> TrieurResult<Vec<PathBuf>> {
    let entries =
        fs::read_dir(source).map_err(|e| TrieurError::from_io(source, "read directory", e))?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| {
            entry
                .inspect_err(|e| {
                    sink.warn(&format!("Unreadable entry in {}: {}", source.display(), e))
                })
                .ok()
        })
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            !name.starts_with('.') && name != LEDGER_FILE_NAME
        })
        .map(|entry| entry.path())
        .collect();
    candidates.sort();
    Ok(candidates)
}
