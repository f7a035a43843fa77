/// File classification by extension, size and modification date.
///
/// The category table is an ordered list: lookups scan it in declaration order
/// and the first category listing the extension wins, so a user-supplied table
/// with overlapping extensions still behaves predictably.
///
/// # Examples
///
/// ```
/// use trieur::file_category::{CategoryTable, SizeBuckets};
///
/// let table = CategoryTable::default();
/// assert_eq!(table.lookup("photo.JPG"), Some("Images"));
/// assert_eq!(table.lookup("notes"), None);
///
/// let buckets = SizeBuckets::default();
/// assert_eq!(buckets.lookup(10 * 1024 * 1024), Some("Moyens"));
/// ```
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;

/// Label used when no category or bucket matches.
pub const FALLBACK_CATEGORY: &str = "Other";

/// Parent folder for date buckets.
pub const DATE_ROOT: &str = "Par Date";

/// Parent folder for size buckets.
pub const SIZE_ROOT: &str = "Par Taille";

const MIB: u64 = 1024 * 1024;

/// A named group of extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// Lowercase extensions including the leading dot.
    pub extensions: Vec<String>,
}

impl Category {
    /// Builds a category, normalising extensions to lowercase with a leading dot.
    pub fn new<S: AsRef<str>>(name: &str, extensions: &[S]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions
                .iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        }
    }

    fn matches(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }
}

/// Ordered mapping from category name to extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Builds a table from an ordered name → extensions map, such as the
    /// `types_fichiers` override of the settings document.
    pub fn from_map(map: &IndexMap<String, Vec<String>>) -> Self {
        Self::new(
            map.iter()
                .map(|(name, exts)| Category::new(name, exts))
                .collect(),
        )
    }

    /// Category names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Returns the internal name of the first category whose extensions
    /// contain the file's extension, compared case-insensitively.
    pub fn lookup(&self, file_name: &str) -> Option<&str> {
        let extension = dotted_extension(file_name)?;
        self.categories
            .iter()
            .find(|c| c.matches(&extension))
            .map(|c| c.name.as_str())
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(vec![
            Category::new(
                "Images",
                &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp", ".svg", ".ico"],
            ),
            Category::new(
                "Vidéos",
                &[
                    ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".mpg",
                    ".mpeg",
                ],
            ),
            Category::new(
                "Documents",
                &[
                    ".pdf", ".doc", ".docx", ".txt", ".rtf", ".odt", ".xls", ".xlsx", ".ppt",
                    ".pptx", ".csv",
                ],
            ),
            Category::new(
                "Audio",
                &[".mp3", ".wav", ".ogg", ".flac", ".aac", ".wma", ".m4a"],
            ),
            Category::new(
                "Archives",
                &[".zip", ".rar", ".7z", ".tar", ".gz", ".tgz", ".bz2"],
            ),
            Category::new(
                "Programmes",
                &[".exe", ".msi", ".app", ".apk", ".bat", ".sh", ".dmg", ".deb", ".rpm"],
            ),
            Category::new(
                "Code",
                &[
                    ".py", ".java", ".js", ".html", ".css", ".php", ".c", ".cpp", ".h", ".cs",
                    ".json", ".xml",
                ],
            ),
        ])
    }
}

/// A half-open byte range `[min, max)`; `max == None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeBucket {
    pub name: String,
    pub min: u64,
    pub max: Option<u64>,
}

impl SizeBucket {
    fn contains(&self, bytes: u64) -> bool {
        bytes >= self.min && self.max.is_none_or(|max| bytes < max)
    }
}

/// Size buckets scanned from small to large.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeBuckets {
    buckets: Vec<SizeBucket>,
}

impl SizeBuckets {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.name.as_str())
    }

    /// Internal name of the first bucket containing `bytes`.
    pub fn lookup(&self, bytes: u64) -> Option<&str> {
        self.buckets
            .iter()
            .find(|b| b.contains(bytes))
            .map(|b| b.name.as_str())
    }
}

impl Default for SizeBuckets {
    fn default() -> Self {
        Self {
            buckets: vec![
                SizeBucket {
                    name: "Petits".to_string(),
                    min: 0,
                    max: Some(MIB),
                },
                SizeBucket {
                    name: "Moyens".to_string(),
                    min: MIB,
                    max: Some(50 * MIB),
                },
                SizeBucket {
                    name: "Grands".to_string(),
                    min: 50 * MIB,
                    max: None,
                },
            ],
        }
    }
}

/// Category display name for `file_name`, or [`FALLBACK_CATEGORY`].
pub fn category_of(
    file_name: &str,
    table: &CategoryTable,
    display_names: &IndexMap<String, String>,
) -> String {
    match table.lookup(file_name) {
        Some(name) => display_name(name, display_names),
        None => FALLBACK_CATEGORY.to_string(),
    }
}

/// Size bucket display name for `bytes`, or [`FALLBACK_CATEGORY`].
pub fn size_bucket_of(
    bytes: u64,
    buckets: &SizeBuckets,
    display_names: &IndexMap<String, String>,
) -> String {
    match buckets.lookup(bytes) {
        Some(name) => display_name(name, display_names),
        None => FALLBACK_CATEGORY.to_string(),
    }
}

/// `YYYY-MM` of the modification time, in local time.
pub fn date_bucket_of(modified: SystemTime) -> String {
    let local: DateTime<Local> = modified.into();
    local.format("%Y-%m").to_string()
}

/// Extension without its dot, lowercased; `None` when the name has none.
pub fn bare_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

fn dotted_extension(file_name: &str) -> Option<String> {
    bare_extension(file_name).map(|ext| format!(".{ext}"))
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// Configured folder name for `name`, falling back to `name` itself.
pub fn display_name(name: &str, display_names: &IndexMap<String, String>) -> String {
    display_names
        .get(name)
        .filter(|d| !d.is_empty())
        .cloned()
        .unwrap_or_else(|| name.to_string())
}
