/// Restore: putting sorted files back where they came from.
///
/// This module reads the move ledger of a source directory, moves every
/// recorded file back to its original path, then removes the folders the
/// sort created once they are empty, and finally deletes the ledger.
use crate::config::SortConfig;
use crate::diagnostics::{DiagnosticsSink, TracingSink};
use crate::error::TrieurError;
use crate::ledger::MoveLedger;
use crate::progress::{Progress, ProgressFn};
use crate::rollback::is_empty_dir;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Represents the result of a restore run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Number of files moved back to their original location.
    pub restored: usize,
    /// Human-readable errors, in the order they happened.
    pub errors: Vec<String>,
    /// Files that occupied an original path and were renamed aside.
    pub set_aside: Vec<PathBuf>,
}

impl RestoreReport {
    fn failed(error: TrieurError) -> Self {
        Self {
            restored: 0,
            errors: vec![error.to_string()],
            set_aside: Vec::new(),
        }
    }

    /// `(restored, errors)`, the shape front-ends display.
    pub fn into_parts(self) -> (usize, Vec<String>) {
        (self.restored, self.errors)
    }

    /// Returns true if every entry was restored and no cleanup step failed.
    pub fn is_complete_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Reverses the last sort of a source directory.
pub struct RestoreEngine<'a> {
    config: Cow<'a, SortConfig>,
    sink: &'a dyn DiagnosticsSink,
}

impl<'a> RestoreEngine<'a> {
    pub fn new(config: &'a SortConfig) -> Self {
        Self {
            config: config.absolutized(),
            sink: &TracingSink,
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticsSink) -> Self {
        self.sink = sink;
        self
    }

    /// Restores every file recorded in the ledger.
    ///
    /// # Edge Cases Handled
    ///
    /// * **No ledger**: nothing is touched, the report carries the `NoBackupFound` message
    /// * **Empty ledger**: nothing is touched, the report carries the `EmptyBackup` message
    /// * **File not found**: recorded as an error and skipped
    /// * **File name conflict**: the file occupying the original path is renamed aside
    ///   with a `.bak.<timestamp>` suffix before the restore
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use trieur::config::{SortConfig, SortMode};
    /// use trieur::undo::RestoreEngine;
    ///
    /// let config = SortConfig::new("/path/to/directory", SortMode::ByType);
    /// let report = RestoreEngine::new(&config).run(None);
    /// println!("Restored {} files", report.restored);
    /// ```
    pub fn run(&self, progress: Option<ProgressFn<'_>>) -> RestoreReport {
        let mut progress = Progress::new(progress);
        let source = &self.config.source_directory;

        let ledger = match MoveLedger::load(source) {
            Ok(ledger) => ledger,
            Err(error) => {
                self.sink.error(&error.to_string());
                return RestoreReport::failed(error);
            }
        };
        if ledger.is_empty() {
            let error = TrieurError::EmptyBackup(MoveLedger::path_for(source));
            self.sink.error(&error.to_string());
            return RestoreReport::failed(error);
        }

        self.sink.info(&format!(
            "Restoring {} file(s) in {}",
            ledger.len(),
            source.display()
        ));

        let total = ledger.len();
        let mut restored = 0;
        let mut errors = Vec::new();
        let mut set_aside = Vec::new();
        let mut touched: HashSet<PathBuf> = HashSet::new();

        for (index, (current, original)) in ledger.iter().enumerate() {
            if current.is_file() {
                match self.restore_file(&current, &original) {
                    Ok(backup) => {
                        restored += 1;
                        set_aside.extend(backup);
                        if let Some(parent) = current.parent() {
                            touched.insert(parent.to_path_buf());
                        }
                    }
                    Err(message) => {
                        self.sink.error(&message);
                        errors.push(message);
                    }
                }
            } else {
                let message = format!(
                    "File not found at expected location, skipped: {}",
                    current.display()
                );
                self.sink.warn(&message);
                errors.push(message);
            }
            progress.report(index + 1, total);
        }

        self.remove_created_directories(touched, &mut errors);

        if let Err(error) = MoveLedger::delete(source) {
            self.sink.debug(&error.to_string());
        }

        RestoreReport {
            restored,
            errors,
            set_aside,
        }
    }

    /// Moves one file back, creating the original parent tree if needed.
    /// Returns where a conflicting file was moved, if there was one.
    fn restore_file(&self, current: &Path, original: &Path) -> Result<Option<PathBuf>, String> {
        if let Some(parent) = original.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                format!("Could not recreate directory {}: {}", parent.display(), e)
            })?;
        }

        let mut backup = None;
        if original.exists() {
            let backup_path = generate_backup_path(original);
            fs::rename(original, &backup_path).map_err(|e| {
                format!(
                    "Could not back up conflicting file {}: {}",
                    original.display(),
                    e
                )
            })?;
            self.sink.warn(&format!(
                "{} already existed and was renamed to {}",
                original.display(),
                backup_path.display()
            ));
            backup = Some(backup_path);
        }

        fs::rename(current, original).map_err(|e| {
            format!(
                "Failed to restore {} to {}: {}",
                current.display(),
                original.display(),
                e
            )
        })?;
        self.sink.debug(&format!(
            "Restored {} to {}",
            current.display(),
            original.display()
        ));
        Ok(backup)
    }

    /// Removes the folders touched by this restore, deepest first, then every
    /// folder a sort may create under the source directory. Non-empty
    /// candidates only lose their empty sub-folders.
    fn remove_created_directories(&self, touched: HashSet<PathBuf>, errors: &mut Vec<String>) {
        let source = &self.config.source_directory;

        let mut candidates: Vec<PathBuf> = touched.into_iter().collect();
        candidates.sort_by(|a, b| {
            b.components()
                .count()
                .cmp(&a.components().count())
                .then_with(|| a.cmp(b))
        });
        candidates.extend(
            self.config
                .managed_folder_names()
                .into_iter()
                .map(|name| source.join(name))
                .filter(|dir| dir.is_dir()),
        );

        for dir in candidates {
            if !dir.is_dir() || dir == *source || !dir.starts_with(source) {
                continue;
            }
            if is_empty_dir(&dir) {
                match fs::remove_dir(&dir) {
                    Ok(()) => self
                        .sink
                        .debug(&format!("Removed directory {}", dir.display())),
                    Err(e) => {
                        let message =
                            format!("Could not remove directory {}: {}", dir.display(), e);
                        self.sink.warn(&message);
                        errors.push(message);
                    }
                }
            } else {
                self.prune_empty_subtree(&dir);
            }
        }
    }

    /// Removes every directory under (and including) `root` that holds
    /// neither files nor sub-directories, bottom-up.
    fn prune_empty_subtree(&self, root: &Path) {
        let directories = WalkDir::new(root)
            .contents_first(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir());

        for entry in directories {
            if !is_empty_dir(entry.path()) {
                continue;
            }
            if let Err(e) = fs::remove_dir(entry.path()) {
                self.sink.warn(&format!(
                    "Could not remove directory {}: {}",
                    entry.path().display(),
                    e
                ));
            }
        }
    }
}

/// Restores `config.source_directory`, logging through `tracing`.
pub fn restore(config: &SortConfig, progress: Option<ProgressFn<'_>>) -> RestoreReport {
    RestoreEngine::new(config).run(progress)
}

/// Generates a backup path for a file by appending a timestamp.
///
/// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
fn generate_backup_path(original_path: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let filename = original_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());

    let mut candidate = original_path.with_file_name(format!("{filename}.bak.{timestamp}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = original_path.with_file_name(format!("{filename}.bak.{timestamp}-{counter}"));
        counter += 1;
    }
    candidate
}
