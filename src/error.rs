//! Error kinds raised by the sorting core.
//!
//! Every variant renders to a plain sentence. The engines put these strings
//! verbatim into the error list of a run report so a front-end can display
//! them without further formatting.

use std::path::PathBuf;
use thiserror::Error;

/// Closed set of failures the core can report.
#[derive(Debug, Error)]
pub enum TrieurError {
    /// The configured source directory is missing or not a directory.
    #[error("Invalid source directory: {}", .0.display())]
    InvalidSourceDirectory(PathBuf),

    /// The source directory holds no candidate files.
    #[error("No files found in {}", .0.display())]
    NoFilesFound(PathBuf),

    /// A specific file vanished before it could be moved.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Read or write access refused, including a failed attempt to clear a read-only flag.
    #[error("Permission denied on {}: {context}", path.display())]
    PermissionDenied { path: PathBuf, context: String },

    /// Free space on the destination volume is below the required amount plus margin.
    #[error(
        "Insufficient disk space for {}: need {required} bytes, have {available} bytes",
        dest.display()
    )]
    InsufficientSpace {
        required: u64,
        available: u64,
        dest: PathBuf,
    },

    /// Generic I/O failure while creating a directory or renaming a file.
    #[error("Failed to move {}: {reason}", path.display())]
    MoveFailed { path: PathBuf, reason: String },

    /// No ledger file exists for the source directory.
    #[error("No backup found in {}", .0.display())]
    NoBackupFound(PathBuf),

    /// The ledger file exists but records no moves.
    #[error("Backup is empty: {}", .0.display())]
    EmptyBackup(PathBuf),

    /// The configured sort mode is not one of type, date or size.
    #[error("Unknown sort mode: '{0}'")]
    BadSortMode(String),

    /// The ledger file could not be read or parsed.
    #[error("Failed to read backup {}: {reason}", path.display())]
    LedgerReadFailed { path: PathBuf, reason: String },

    /// The ledger file could not be written.
    #[error("Failed to write backup {}: {reason}", path.display())]
    LedgerWriteFailed { path: PathBuf, reason: String },
}

impl TrieurError {
    /// Structural failures stop a sort run and roll back everything it did.
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::InsufficientSpace { .. } | Self::MoveFailed { .. }
        )
    }

    /// Maps an I/O error on `path` to the matching core error kind.
    pub(crate) fn from_io(path: &std::path::Path, context: &str, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_path_buf(),
                context: format!("{context}: {e}"),
            },
            _ => Self::MoveFailed {
                path: path.to_path_buf(),
                reason: format!("{context}: {e}"),
            },
        }
    }
}

/// Result type used throughout the core.
pub type TrieurResult<T> = Result<T, TrieurError>;
