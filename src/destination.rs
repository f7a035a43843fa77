//! Destination resolution: which folder a file belongs in.
//!
//! Resolution never creates directories. Date and size modes stat the file
//! once; a failed stat is a skip, not an error.

use crate::config::{SortConfig, SortMode};
use crate::file_category::{DATE_ROOT, SIZE_ROOT, bare_extension};
use std::fs;
use std::path::{Path, PathBuf};

/// Why a file gets no destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file could not be stat'ed (date and size modes only).
    StatFailed(String),
    /// The configured mode is unknown; every file is skipped.
    BadMode(String),
}

/// Outcome of resolving one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Absolute destination directory, without the file name.
    Directory(PathBuf),
    Skip(SkipReason),
}

/// Computes the destination directory for `file_path`, a regular file
/// directly under the source directory of `config`.
pub fn resolve(file_path: &Path, config: &SortConfig) -> Resolution {
    let source = &config.source_directory;
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match &config.mode {
        SortMode::ByType => {
            let mut destination = source.join(config.category_of(&file_name));
            if config.subfolder_by_extension
                && let Some(extension) = bare_extension(&file_name)
            {
                destination.push(extension);
            }
            Resolution::Directory(destination)
        }
        SortMode::ByDate => match fs::metadata(file_path).and_then(|m| m.modified()) {
            Ok(modified) => Resolution::Directory(
                source
                    .join(DATE_ROOT)
                    .join(config.date_bucket_of(modified)),
            ),
            Err(e) => Resolution::Skip(SkipReason::StatFailed(e.to_string())),
        },
        SortMode::BySize => match fs::metadata(file_path) {
            Ok(metadata) => Resolution::Directory(
                source
                    .join(SIZE_ROOT)
                    .join(config.size_bucket_of(metadata.len())),
            ),
            Err(e) => Resolution::Skip(SkipReason::StatFailed(e.to_string())),
        },
        SortMode::Unrecognized(raw) => Resolution::Skip(SkipReason::BadMode(raw.clone())),
    }
}
