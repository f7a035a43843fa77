//! Sort configuration and the persisted settings document.
//!
//! A [`SortConfig`] is the immutable input of one sort or restore run. It is
//! derived from [`Settings`], the key-value document a front-end keeps in the
//! user's profile. Settings are JSON by default; a `.toml` path switches the
//! format.
//!
//! # Settings File Format
//!
//! ```json
//! {
//!   "theme": "dark",
//!   "dossier_source": "/home/user/Downloads",
//!   "type_tri": "type",
//!   "noms_dossiers": { "Images": "Images", "Vidéos": "Vidéos" },
//!   "tailles_fichiers": { "Petits": "Petits", "Moyens": "Moyens", "Grands": "Grands" },
//!   "sous_dossiers_par_extension": true
//! }
//! ```

use crate::file_category::{
    CategoryTable, DATE_ROOT, FALLBACK_CATEGORY, SIZE_ROOT, SizeBuckets, category_of,
    date_bucket_of, display_name, size_bucket_of,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;
use thiserror::Error;

/// File name of the settings document in the user's home directory.
pub const SETTINGS_FILE_NAME: &str = ".trieur_fichiers_config.json";

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("IO error on configuration: {0}")]
    IoError(String),
}

/// How files are grouped into folders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortMode {
    ByType,
    ByDate,
    BySize,
    /// Any value the engine does not know; every file is skipped.
    Unrecognized(String),
}

impl SortMode {
    /// Settings-document spelling of the mode.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ByType => "type",
            Self::ByDate => "date",
            Self::BySize => "taille",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl FromStr for SortMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "type" | "by_type" => Self::ByType,
            "date" | "by_date" => Self::ByDate,
            "taille" | "size" | "by_size" => Self::BySize,
            _ => Self::Unrecognized(s.to_string()),
        })
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input of one sort or restore run.
#[derive(Debug, Clone)]
pub struct SortConfig {
    pub source_directory: PathBuf,
    pub mode: SortMode,
    /// Category name → folder name overrides.
    pub category_display_names: IndexMap<String, String>,
    /// Size bucket name → folder name overrides.
    pub size_bucket_display_names: IndexMap<String, String>,
    pub subfolder_by_extension: bool,
    pub category_table: CategoryTable,
    pub size_buckets: SizeBuckets,
}

impl SortConfig {
    /// Configuration with the default tables for `source_directory`.
    ///
    /// A relative directory is resolved against the current working directory.
    pub fn new(source_directory: impl Into<PathBuf>, mode: SortMode) -> Self {
        Self {
            source_directory: absolute_source(source_directory.into()),
            mode,
            category_display_names: IndexMap::new(),
            size_bucket_display_names: IndexMap::new(),
            subfolder_by_extension: true,
            category_table: CategoryTable::default(),
            size_buckets: SizeBuckets::default(),
        }
    }

    /// This configuration with an absolute source directory, cloning only
    /// when the directory is relative. Ledger entries are always absolute.
    pub fn absolutized(&self) -> Cow<'_, SortConfig> {
        if self.source_directory.is_absolute() {
            return Cow::Borrowed(self);
        }
        let mut config = self.clone();
        config.source_directory = absolute_source(config.source_directory);
        Cow::Owned(config)
    }

    pub fn with_subfolders(mut self, enabled: bool) -> Self {
        self.subfolder_by_extension = enabled;
        self
    }

    pub fn category_of(&self, file_name: &str) -> String {
        category_of(file_name, &self.category_table, &self.category_display_names)
    }

    pub fn size_bucket_of(&self, bytes: u64) -> String {
        size_bucket_of(bytes, &self.size_buckets, &self.size_bucket_display_names)
    }

    pub fn date_bucket_of(&self, modified: SystemTime) -> String {
        date_bucket_of(modified)
    }

    /// Every top-level folder a sort with this configuration may create:
    /// category folders, the fallback folder and the date and size roots.
    pub fn managed_folder_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let candidates = self
            .category_table
            .names()
            .map(|n| display_name(n, &self.category_display_names))
            .chain(self.category_display_names.values().cloned())
            .chain(
                [FALLBACK_CATEGORY, DATE_ROOT, SIZE_ROOT]
                    .into_iter()
                    .map(String::from),
            );
        for name in candidates {
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Appearance theme, only meaningful to the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// The settings document a front-end persists between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,

    /// Source directory.
    #[serde(default)]
    pub dossier_source: String,

    /// Sort mode: "type", "date" or "taille".
    #[serde(default = "default_sort_mode")]
    pub type_tri: String,

    #[serde(default = "default_subfolders")]
    pub sous_dossiers_par_extension: bool,

    /// Category folder name overrides.
    #[serde(default = "default_category_names")]
    pub noms_dossiers: IndexMap<String, String>,

    /// Size bucket folder name overrides.
    #[serde(default = "default_size_names")]
    pub tailles_fichiers: IndexMap<String, String>,

    /// Optional replacement for the built-in category table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types_fichiers: Option<IndexMap<String, Vec<String>>>,
}

fn default_sort_mode() -> String {
    "type".to_string()
}

fn default_category_names() -> IndexMap<String, String> {
    CategoryTable::default()
        .names()
        .map(|n| (n.to_string(), n.to_string()))
        .collect()
}

fn default_size_names() -> IndexMap<String, String> {
    SizeBuckets::default()
        .names()
        .map(|n| (n.to_string(), n.to_string()))
        .collect()
}

fn default_subfolders() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            dossier_source: String::new(),
            type_tri: default_sort_mode(),
            sous_dossiers_par_extension: default_subfolders(),
            noms_dossiers: default_category_names(),
            tailles_fichiers: default_size_names(),
            types_fichiers: None,
        }
    }
}

impl Settings {
    /// Load settings, with fallback to defaults.
    ///
    /// 1. If `path` is provided, load from that file (errors are returned)
    /// 2. Otherwise try `~/.trieur_fichiers_config.json`
    /// 3. Fall back to defaults when that file is missing or unreadable
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        if let Some(default_path) = Self::default_path()
            && default_path.exists()
            && let Ok(settings) = Self::load_from_file(&default_path)
        {
            return Ok(settings);
        }

        Ok(Self::default())
    }

    /// `~/.trieur_fichiers_config.json`, when `HOME` is set.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(SETTINGS_FILE_NAME))
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        if is_toml(path) {
            toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
        }
    }

    /// Write the settings to `path`, in TOML when the extension says so.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = if is_toml(path) {
            toml::to_string_pretty(self).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }
        fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Derive the configuration of one run.
    pub fn to_sort_config(&self) -> SortConfig {
        let Ok(mode) = self.type_tri.parse::<SortMode>();
        let category_table = self
            .types_fichiers
            .as_ref()
            .map(CategoryTable::from_map)
            .unwrap_or_default();

        SortConfig {
            source_directory: absolute_source(PathBuf::from(&self.dossier_source)),
            mode,
            category_display_names: self.noms_dossiers.clone(),
            size_bucket_display_names: self.tailles_fichiers.clone(),
            subfolder_by_extension: self.sous_dossiers_par_extension,
            category_table,
            size_buckets: SizeBuckets::default(),
        }
    }
}

/// Relative paths are canonicalized so `..` never reaches the ledger. Empty
/// or unresolvable paths are kept as given; validation rejects them later.
fn absolute_source(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    fs::canonicalize(&path)
        .or_else(|_| std::path::absolute(&path))
        .unwrap_or(path)
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}
