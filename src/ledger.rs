/// Persisted move ledger enabling restore.
///
/// The ledger lives next to the files it describes, at
/// `<source>/.trieur_sauvegarde.json`, as a flat JSON object mapping each
/// file's destination path to its original path. Entry order is kept on
/// write and read so a restore replays moves in the order they happened.
use crate::error::{TrieurError, TrieurResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the ledger inside the source directory.
pub const LEDGER_FILE_NAME: &str = ".trieur_sauvegarde.json";

/// Destination path → original path, one entry per moved file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveLedger {
    entries: IndexMap<String, String>,
}

impl MoveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the path to the ledger file for this source directory.
    pub fn path_for(source_dir: &Path) -> PathBuf {
        source_dir.join(LEDGER_FILE_NAME)
    }

    /// Whether a restore is available for `source_dir`.
    pub fn exists(source_dir: &Path) -> bool {
        Self::path_for(source_dir).is_file()
    }

    /// Records that `destination` came from `original`.
    ///
    /// JSON strings cannot hold paths that are not valid UTF-8; such a pair is
    /// refused rather than stored lossily, since restore could never find it.
    pub fn insert(&mut self, destination: &Path, original: &Path) -> TrieurResult<()> {
        let original = utf8_key(original)?;
        let destination = utf8_key(destination)?;
        self.entries
            .insert(destination.to_string(), original.to_string());
        Ok(())
    }

    /// Drops the entry for `destination`, keeping the order of the rest.
    pub fn evict(&mut self, destination: &Path) {
        self.entries
            .shift_remove(destination.to_string_lossy().as_ref());
    }

    pub fn contains(&self, destination: &Path) -> bool {
        self.entries
            .contains_key(destination.to_string_lossy().as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(destination, original)` pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (PathBuf, PathBuf)> + '_ {
        self.entries
            .iter()
            .map(|(dest, orig)| (PathBuf::from(dest), PathBuf::from(orig)))
    }

    /// Saves this ledger as indented JSON, replacing any previous one.
    pub fn save(&self, source_dir: &Path) -> TrieurResult<()> {
        let path = Self::path_for(source_dir);
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            TrieurError::LedgerWriteFailed {
                path: path.clone(),
                reason: format!("JSON serialization failed: {e}"),
            }
        })?;

        fs::write(&path, json).map_err(|e| TrieurError::LedgerWriteFailed {
            path,
            reason: e.to_string(),
        })
    }

    /// Loads the ledger of `source_dir`.
    ///
    /// Fails with `NoBackupFound` when there is no ledger file.
    pub fn load(source_dir: &Path) -> TrieurResult<Self> {
        let path = Self::path_for(source_dir);
        if !path.is_file() {
            return Err(TrieurError::NoBackupFound(source_dir.to_path_buf()));
        }

        let json = fs::read_to_string(&path).map_err(|e| TrieurError::LedgerReadFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&json).map_err(|e| TrieurError::LedgerReadFailed {
            path,
            reason: format!("JSON parse error: {e}"),
        })
    }

    /// Deletes the ledger file of `source_dir`, if any.
    pub fn delete(source_dir: &Path) -> TrieurResult<()> {
        let path = Self::path_for(source_dir);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| TrieurError::LedgerWriteFailed {
                path,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

fn utf8_key(path: &Path) -> TrieurResult<&str> {
    path.to_str().ok_or_else(|| TrieurError::LedgerWriteFailed {
        path: path.to_path_buf(),
        reason: "path is not valid UTF-8 and cannot be recorded".to_string(),
    })
}
