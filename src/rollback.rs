//! Same-run rollback of partially applied sorts.
//!
//! The [`RollbackLog`] records each reversible step after it physically
//! succeeded. When a sort aborts, [`rollback`] replays the log backwards:
//! moved files go back to their origin and directories created by the run
//! are removed if they ended up empty. Failures are collected, never raised.

use crate::diagnostics::DiagnosticsSink;
use std::fs;
use std::path::{Path, PathBuf};

/// A reversible step taken during the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOp {
    CreateDirectory(PathBuf),
    MoveFile { from: PathBuf, to: PathBuf },
}

/// Ordered record of one run's reversible steps. Never persisted.
#[derive(Debug, Default)]
pub struct RollbackLog {
    ops: Vec<RollbackOp>,
}

impl RollbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_directory(&mut self, path: &Path) {
        self.ops.push(RollbackOp::CreateDirectory(path.to_path_buf()));
    }

    pub fn record_move(&mut self, from: &Path, to: &Path) {
        self.ops.push(RollbackOp::MoveFile {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
    }

    pub fn ops(&self) -> &[RollbackOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

/// Undoes every step in `log`, newest first, then clears it.
///
/// Each entry is attempted at most once. The returned strings describe the
/// steps that could not be undone.
pub fn rollback(log: &mut RollbackLog, sink: &dyn DiagnosticsSink) -> Vec<String> {
    let mut errors = Vec::new();
    sink.warn(&format!("Rolling back {} operation(s)", log.len()));

    for op in log.ops.iter().rev() {
        match op {
            RollbackOp::MoveFile { from, to } => {
                if !to.exists() {
                    sink.debug(&format!("Nothing to move back at {}", to.display()));
                    continue;
                }
                match fs::rename(to, from) {
                    Ok(()) => sink.debug(&format!(
                        "Moved {} back to {}",
                        to.display(),
                        from.display()
                    )),
                    Err(e) => errors.push(format!(
                        "Rollback failed to move {} back to {}: {}",
                        to.display(),
                        from.display(),
                        e
                    )),
                }
            }
            RollbackOp::CreateDirectory(path) => {
                if !is_empty_dir(path) {
                    continue;
                }
                match fs::remove_dir(path) {
                    Ok(()) => sink.debug(&format!("Removed directory {}", path.display())),
                    Err(e) => errors.push(format!(
                        "Rollback failed to remove directory {}: {}",
                        path.display(),
                        e
                    )),
                }
            }
        }
    }

    for error in &errors {
        sink.error(error);
    }
    log.clear();
    errors
}

pub(crate) fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
