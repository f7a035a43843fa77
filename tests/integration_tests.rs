/// Integration tests for trieur
///
/// These tests drive the public sort and restore entrypoints end to end on
/// real temporary directories.
///
/// Test categories:
/// 1. Sorting by type, date and size
/// 2. Sort then restore round trips
/// 3. Collisions and conflicts
/// 4. Fail-fast abort and rollback
/// 5. Settings-driven runs
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trieur::file_organizer::{Mover, SafeMover};
use trieur::rollback::RollbackLog;
use trieur::{
    MoveLedger, NullSink, RestoreEngine, RunStatus, Settings, SortConfig, SortEngine, SortMode,
    TrieurError, TrieurResult, restore, sort,
};

// ============================================================================
// Test Utilities
// ============================================================================

const MIB: u64 = 1024 * 1024;

/// A test fixture that sets up a temporary source directory.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    /// Create a new test fixture with a temporary directory.
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir }
    }

    /// Get the path to the test directory.
    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn config(&self, mode: SortMode) -> SortConfig {
        SortConfig::new(self.path(), mode)
    }

    /// Create a file with content in the test directory.
    fn create_file(&self, name: &str, content: &[u8]) {
        let file_path = self.path().join(name);
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content)
            .expect("Failed to write file content");
    }

    /// Create a sparse file of `len` bytes.
    fn create_sized_file(&self, name: &str, len: u64) {
        File::create(self.path().join(name))
            .and_then(|f| f.set_len(len))
            .expect("Failed to create sized file");
    }

    /// Assert that a file exists at the given relative path.
    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    /// Assert that nothing exists at the given relative path.
    fn assert_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "Path should not exist: {}", path.display());
    }

    /// Name → contents of every top-level regular file, ledger excluded.
    fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        fs::read_dir(self.path())
            .expect("Failed to read directory")
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name != ".trieur_sauvegarde.json")
            .map(|name| {
                let content = fs::read(self.path().join(&name)).expect("Failed to read file");
                (name, content)
            })
            .collect()
    }

    /// Names of the top-level directories.
    fn dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = fs::read_dir(self.path())
            .expect("Failed to read directory")
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        dirs.sort();
        dirs
    }

    fn ledger_exists(&self) -> bool {
        MoveLedger::exists(self.path())
    }
}

fn run_sort(config: &SortConfig) -> trieur::SortReport {
    SortEngine::new(config).with_sink(&NullSink).run(None)
}

fn run_restore(config: &SortConfig) -> trieur::RestoreReport {
    RestoreEngine::new(config).with_sink(&NullSink).run(None)
}

/// `path` spelled relative to the current working directory.
#[cfg(unix)]
fn relative_to_cwd(path: &Path) -> PathBuf {
    let cwd = std::env::current_dir().expect("Failed to read working directory");
    let mut relative = PathBuf::new();
    for _ in cwd.components().skip(1) {
        relative.push("..");
    }
    relative.join(path.strip_prefix("/").expect("absolute temp path"))
}

/// Delegates to the real mover but refuses the n-th file with `PermissionDenied`.
struct DenyNth {
    n: usize,
    seen: usize,
}

impl Mover for DenyNth {
    fn move_file(
        &mut self,
        source: &Path,
        destination_dir: &Path,
        file_name: &OsStr,
        log: &mut RollbackLog,
    ) -> TrieurResult<PathBuf> {
        self.seen += 1;
        if self.seen == self.n {
            return Err(TrieurError::PermissionDenied {
                path: source.to_path_buf(),
                context: "write access refused".to_string(),
            });
        }
        SafeMover.move_file(source, destination_dir, file_name, log)
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn test_sort_by_type_concrete_scenario() {
    let fixture = TestFixture::new();
    fixture.create_sized_file("report.pdf", 2 * 1024);
    fixture.create_sized_file("photo.jpg", 3 * MIB);
    fixture.create_sized_file("clip.mp4", 80 * MIB);
    let config = fixture.config(SortMode::ByType).with_subfolders(true);

    let report = run_sort(&config);

    assert_eq!(report.processed, 3);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    fixture.assert_file_exists("Documents/pdf/report.pdf");
    fixture.assert_file_exists("Images/jpg/photo.jpg");
    fixture.assert_file_exists("Vidéos/mp4/clip.mp4");
    assert_eq!(
        MoveLedger::load(fixture.path()).expect("ledger").len(),
        3
    );

    let restored = run_restore(&config);

    assert_eq!(restored.restored, 3);
    assert!(restored.errors.is_empty(), "{:?}", restored.errors);
    fixture.assert_file_exists("report.pdf");
    fixture.assert_file_exists("photo.jpg");
    fixture.assert_file_exists("clip.mp4");
    fixture.assert_not_exists("Documents");
    fixture.assert_not_exists("Images");
    fixture.assert_not_exists("Vidéos");
    assert!(!fixture.ledger_exists());
}

#[test]
fn test_sort_by_size_places_medium_file() {
    let fixture = TestFixture::new();
    fixture.create_sized_file("dump.bin", 10 * MIB);
    fixture.create_sized_file("tiny.txt", 10);

    let report = run_sort(&fixture.config(SortMode::BySize));

    assert_eq!(report.processed, 2);
    fixture.assert_file_exists("Par Taille/Moyens/dump.bin");
    fixture.assert_file_exists("Par Taille/Petits/tiny.txt");
}

#[test]
fn test_sort_by_date_uses_month_folders() {
    let fixture = TestFixture::new();
    fixture.create_file("notes.txt", b"notes");
    let modified = fs::metadata(fixture.path().join("notes.txt"))
        .and_then(|m| m.modified())
        .expect("mtime");
    let config = fixture.config(SortMode::ByDate);
    let bucket = config.date_bucket_of(modified);

    let report = run_sort(&config);

    assert_eq!(report.processed, 1);
    fixture.assert_file_exists(&format!("Par Date/{}/notes.txt", bucket));

    run_restore(&config);
    fixture.assert_file_exists("notes.txt");
    fixture.assert_not_exists("Par Date");
}

#[test]
fn test_sort_mixed_case_extensions() {
    let fixture = TestFixture::new();
    fixture.create_file("PHOTO.JPG", b"jpg");
    fixture.create_file("Song.Mp3", b"mp3");

    let report = run_sort(&fixture.config(SortMode::ByType));

    assert_eq!(report.processed, 2);
    fixture.assert_file_exists("Images/jpg/PHOTO.JPG");
    fixture.assert_file_exists("Audio/mp3/Song.Mp3");
}

#[test]
fn test_sort_skips_hidden_files_and_directories() {
    let fixture = TestFixture::new();
    fixture.create_file(".hidden.txt", b"secret");
    fixture.create_file("visible.txt", b"visible");
    fs::create_dir(fixture.path().join("existing")).expect("mkdir");
    fixture.create_file("existing/inner.txt", b"inner");

    let report = run_sort(&fixture.config(SortMode::ByType));

    assert_eq!(report.processed, 1);
    fixture.assert_file_exists(".hidden.txt");
    fixture.assert_file_exists("existing/inner.txt");
    fixture.assert_file_exists("Documents/txt/visible.txt");
}

#[test]
fn test_sort_custom_display_names() {
    let fixture = TestFixture::new();
    fixture.create_file("a.png", b"png");
    let mut config = fixture.config(SortMode::ByType).with_subfolders(false);
    config
        .category_display_names
        .insert("Images".to_string(), "Photos".to_string());

    let report = run_sort(&config);
    assert_eq!(report.processed, 1);
    fixture.assert_file_exists("Photos/a.png");

    run_restore(&config);
    fixture.assert_file_exists("a.png");
    fixture.assert_not_exists("Photos");
}

#[test]
fn test_sort_invalid_directory() {
    let config = SortConfig::new("/non/existent/trieur/dir", SortMode::ByType);
    let (processed, errors) = sort(&config, None).into_parts();
    assert_eq!(processed, 0);
    assert_eq!(errors.len(), 1);
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_round_trip_restores_exact_layout() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"alpha");
    fixture.create_file("b.jpg", b"\xFF\xD8\xFF jpeg bytes");
    fixture.create_file("c.tar.gz", b"archive");
    fixture.create_file("README", b"no extension");
    fixture.create_file("weird name (1).pdf", b"pdf");
    fixture.create_file("d.unknownext", b"???");
    let before = fixture.snapshot();
    let config = fixture.config(SortMode::ByType);

    let report = sort(&config, None);
    assert_eq!(report.processed, before.len());
    assert!(fixture.snapshot().is_empty());

    let mut calls = Vec::new();
    let mut record = |done: usize, total: usize| calls.push((done, total));
    let restored = restore(&config, Some(&mut record));

    assert_eq!(restored.restored, before.len());
    assert_eq!(fixture.snapshot(), before);
    assert!(fixture.dirs().is_empty(), "{:?}", fixture.dirs());
    assert!(!fixture.ledger_exists());
    assert_eq!(calls.len(), before.len());
    assert_eq!(calls.last(), Some(&(before.len(), before.len())));
}

#[test]
fn test_round_trip_all_modes() {
    for mode in [SortMode::ByType, SortMode::ByDate, SortMode::BySize] {
        let fixture = TestFixture::new();
        fixture.create_file("one.doc", b"1");
        fixture.create_file("two.wav", b"2");
        fixture.create_sized_file("three.iso", 2 * MIB);
        let before = fixture.snapshot();
        let config = fixture.config(mode.clone());

        assert_eq!(run_sort(&config).processed, 3, "{mode}");
        assert_eq!(run_restore(&config).restored, 3, "{mode}");
        assert_eq!(fixture.snapshot(), before, "{mode}");
        assert!(fixture.dirs().is_empty(), "{mode}: {:?}", fixture.dirs());
    }
}

#[cfg(unix)]
#[test]
fn test_relative_source_restores_from_absolute_path() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"alpha");
    let relative = relative_to_cwd(fixture.path());

    for sort_config in [
        SortConfig::new(&relative, SortMode::ByType),
        // Bypasses the constructor; the engine still records absolute paths.
        {
            let mut config = fixture.config(SortMode::ByType);
            config.source_directory = relative.clone();
            config
        },
    ] {
        assert_eq!(run_sort(&sort_config).processed, 1);
        let ledger = MoveLedger::load(fixture.path()).expect("ledger");
        for (destination, original) in ledger.iter() {
            assert!(destination.is_absolute(), "{}", destination.display());
            assert!(original.is_absolute(), "{}", original.display());
        }

        let restored = run_restore(&fixture.config(SortMode::ByType));
        assert_eq!(restored.restored, 1, "{:?}", restored.errors);
        assert_eq!(fs::read(fixture.path().join("a.txt")).expect("read"), b"alpha");
        assert!(fixture.dirs().is_empty(), "{:?}", fixture.dirs());
        assert!(!fixture.ledger_exists());
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_name_survives_round_trip() {
    use std::os::unix::ffi::OsStrExt;

    let fixture = TestFixture::new();
    let odd = fixture.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
    fs::write(&odd, b"odd").expect("Failed to write file");
    fixture.create_file("plain.txt", b"plain");
    let config = fixture.config(SortMode::ByType);

    let report = run_sort(&config);
    assert_eq!(report.processed, 1);
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    assert!(odd.is_file());

    let restored = run_restore(&config);
    assert_eq!(restored.restored, 1, "{:?}", restored.errors);
    assert!(odd.is_file());
    fixture.assert_file_exists("plain.txt");
    assert!(fixture.dirs().is_empty(), "{:?}", fixture.dirs());
}

#[test]
fn test_restore_without_ledger_changes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"a");
    fs::create_dir(fixture.path().join("Documents")).expect("mkdir");
    let before = fixture.snapshot();

    let (restored, errors) = run_restore(&fixture.config(SortMode::ByType)).into_parts();

    assert_eq!(restored, 0);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("No backup found"));
    assert_eq!(fixture.snapshot(), before);
    assert_eq!(fixture.dirs(), vec!["Documents".to_string()]);
}

#[test]
fn test_second_restore_finds_no_backup() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"a");
    let config = fixture.config(SortMode::ByType);
    run_sort(&config);

    assert_eq!(run_restore(&config).restored, 1);
    let second = run_restore(&config);
    assert_eq!(second.restored, 0);
    assert!(second.errors[0].contains("No backup found"));
}

#[test]
fn test_sort_again_after_adding_files() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"a");
    let config = fixture.config(SortMode::ByType);
    assert_eq!(run_sort(&config).processed, 1);

    fixture.create_file("b.png", b"b");
    assert_eq!(run_sort(&config).processed, 1);

    // The second ledger replaces the first.
    let ledger = MoveLedger::load(fixture.path()).expect("ledger");
    assert_eq!(ledger.len(), 1);
    assert!(ledger.contains(&fixture.path().join("Images/png/b.png")));
}

// ============================================================================
// Collisions
// ============================================================================

#[test]
fn test_collision_both_files_survive_round_trip() {
    let fixture = TestFixture::new();
    fs::create_dir_all(fixture.path().join("Documents/pdf")).expect("mkdir");
    fixture.create_file("Documents/pdf/report.pdf", b"already there");
    fixture.create_file("report.pdf", b"to be sorted");
    let config = fixture.config(SortMode::ByType);

    let report = run_sort(&config);
    assert_eq!(report.processed, 1);

    let sorted: Vec<String> = fs::read_dir(fixture.path().join("Documents/pdf"))
        .expect("read dir")
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(sorted.len(), 2, "{sorted:?}");
    assert!(sorted.iter().any(|n| n.starts_with("report_") && n.ends_with(".pdf")));

    let restored = run_restore(&config);
    assert_eq!(restored.restored, 1);
    assert_eq!(
        fs::read(fixture.path().join("report.pdf")).expect("read"),
        b"to be sorted"
    );
    assert_eq!(
        fs::read(fixture.path().join("Documents/pdf/report.pdf")).expect("read"),
        b"already there"
    );
}

// ============================================================================
// Fail-fast abort
// ============================================================================

#[test]
fn test_permission_denied_rolls_back_run() {
    let fixture = TestFixture::new();
    for name in ["a.txt", "b.jpg", "c.mp3", "d.zip", "e.py"] {
        fixture.create_file(name, name.as_bytes());
    }
    let before = fixture.snapshot();
    let config = fixture.config(SortMode::ByType);

    let report = SortEngine::new(&config)
        .with_sink(&NullSink)
        .with_mover(DenyNth { n: 4, seen: 0 })
        .run(None);

    assert_eq!(report.status, RunStatus::Aborted);
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    assert!(report.errors[0].contains("write access refused"));
    assert_eq!(fixture.snapshot(), before);
    assert!(fixture.dirs().is_empty(), "{:?}", fixture.dirs());
    assert!(!fixture.ledger_exists());
}

#[test]
fn test_abort_on_first_file_leaves_directory_untouched() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"a");
    fixture.create_file("b.txt", b"b");
    let before = fixture.snapshot();
    let config = fixture.config(SortMode::ByType);

    let report = SortEngine::new(&config)
        .with_sink(&NullSink)
        .with_mover(DenyNth { n: 1, seen: 0 })
        .run(None);

    assert!(report.is_aborted());
    assert_eq!(fixture.snapshot(), before);
    assert!(fixture.dirs().is_empty());
}

#[test]
fn test_abort_keeps_preexisting_category_folders() {
    let fixture = TestFixture::new();
    fs::create_dir(fixture.path().join("Documents")).expect("mkdir");
    fixture.create_file("a.txt", b"a");
    fixture.create_file("b.txt", b"b");
    let config = fixture.config(SortMode::ByType);

    SortEngine::new(&config)
        .with_sink(&NullSink)
        .with_mover(DenyNth { n: 2, seen: 0 })
        .run(None);

    assert_eq!(fixture.dirs(), vec!["Documents".to_string()]);
    fixture.assert_not_exists("Documents/txt");
    fixture.assert_file_exists("a.txt");
}

// ============================================================================
// Settings-driven runs
// ============================================================================

#[test]
fn test_settings_document_drives_sort() {
    let fixture = TestFixture::new();
    fixture.create_file("clip.mkv", b"mkv");
    let settings_dir = TempDir::new().expect("Failed to create temp directory");
    let settings_path = settings_dir.path().join("trieur.json");
    fs::write(
        &settings_path,
        format!(
            r#"{{
                "theme": "light",
                "dossier_source": {},
                "type_tri": "type",
                "noms_dossiers": {{"Vidéos": "Films"}},
                "sous_dossiers_par_extension": false
            }}"#,
            serde_json::to_string(&fixture.path().to_string_lossy()).expect("json")
        ),
    )
    .expect("Failed to write settings");

    let settings = Settings::load(Some(&settings_path)).expect("settings");
    let config = settings.to_sort_config();
    let report = run_sort(&config);

    assert_eq!(report.processed, 1);
    fixture.assert_file_exists("Films/clip.mkv");

    run_restore(&config);
    fixture.assert_file_exists("clip.mkv");
    fixture.assert_not_exists("Films");
}

#[test]
fn test_unknown_mode_from_settings() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"a");
    let mut settings = Settings::default();
    settings.dossier_source = fixture.path().to_string_lossy().into_owned();
    settings.type_tri = "alphabetique".to_string();

    let (processed, errors) = sort(&settings.to_sort_config(), None).into_parts();

    assert_eq!(processed, 0);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("alphabetique"));
    fixture.assert_file_exists("a.txt");
    assert!(!fixture.ledger_exists());
}
