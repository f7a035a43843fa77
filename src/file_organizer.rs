/// Safe, validated, reversible single-file moves.
///
/// [`SafeMover`] checks that the source is still there and accessible, that
/// the destination volume has room for it with a 10% margin, creates the
/// destination tree one level at a time and finally renames the file. Every
/// directory it creates and the move itself are appended to the run's
/// [`RollbackLog`] as soon as they succeed.
use crate::error::{TrieurError, TrieurResult};
use crate::rollback::RollbackLog;
use chrono::Local;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Performs one file move for the sort engine.
///
/// Implementations must record every directory they create and the final
/// move in `log`, and return the path the file ended up at.
pub trait Mover {
    fn move_file(
        &mut self,
        source: &Path,
        destination_dir: &Path,
        file_name: &OsStr,
        log: &mut RollbackLog,
    ) -> TrieurResult<PathBuf>;
}

/// The production mover.
#[derive(Debug, Default, Clone, Copy)]
pub struct SafeMover;

impl Mover for SafeMover {
    /// Moves `source` to `destination_dir/file_name`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use trieur::file_organizer::{Mover, SafeMover};
    /// use trieur::rollback::RollbackLog;
    /// use std::ffi::OsStr;
    /// use std::path::Path;
    ///
    /// let mut log = RollbackLog::new();
    /// let result = SafeMover.move_file(
    ///     Path::new("/path/to/base/image.png"),
    ///     Path::new("/path/to/base/Images/png"),
    ///     OsStr::new("image.png"),
    ///     &mut log,
    /// );
    ///
    /// match result {
    ///     Ok(path) => println!("Moved to {}", path.display()),
    ///     Err(e) => eprintln!("Move failed: {}", e),
    /// }
    /// ```
    fn move_file(
        &mut self,
        source: &Path,
        destination_dir: &Path,
        file_name: &OsStr,
        log: &mut RollbackLog,
    ) -> TrieurResult<PathBuf> {
        let size = check_source(source)?;
        check_access(source)?;
        check_free_space(destination_dir, size)?;
        create_dir_tree(destination_dir, log)?;

        let destination = destination_dir.join(file_name);
        fs::rename(source, &destination).map_err(|e| {
            TrieurError::from_io(
                source,
                &format!("rename to {}", destination.display()),
                e,
            )
        })?;
        log.record_move(source, &destination);

        Ok(destination)
    }
}

/// Bytes that must be free to accept `bytes`: the size plus 10%, rounded up.
pub fn required_with_margin(bytes: u64) -> u64 {
    bytes.saturating_add(bytes.div_ceil(10))
}

/// Returns `destination_dir/file_name`, or a timestamped variant of it when
/// that path is taken.
///
/// Example: `report.pdf` becomes `report_20251109143052123456.pdf`.
pub fn unique_destination(destination_dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = destination_dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = name.extension().map(|e| e.to_string_lossy().into_owned());
    let stamp = Local::now().format("%Y%m%d%H%M%S%6f").to_string();

    let with_suffix = |suffix: &str| match &extension {
        Some(ext) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{stem}_{suffix}"),
    };

    let mut candidate = destination_dir.join(with_suffix(&stamp));
    let mut counter = 1;
    while candidate.exists() {
        candidate = destination_dir.join(with_suffix(&format!("{stamp}_{counter}")));
        counter += 1;
    }
    candidate
}

fn check_source(source: &Path) -> TrieurResult<u64> {
    match fs::metadata(source) {
        Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
        Ok(_) => Err(TrieurError::NotFound(source.to_path_buf())),
        Err(e) => Err(TrieurError::from_io(source, "stat", e)),
    }
}

fn check_access(source: &Path) -> TrieurResult<()> {
    File::open(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TrieurError::NotFound(source.to_path_buf()),
        _ => TrieurError::PermissionDenied {
            path: source.to_path_buf(),
            context: format!("not readable: {e}"),
        },
    })?;

    let metadata = fs::metadata(source).map_err(|e| TrieurError::from_io(source, "stat", e))?;
    if metadata.permissions().readonly() {
        clear_readonly(source, metadata.permissions()).map_err(|e| {
            TrieurError::PermissionDenied {
                path: source.to_path_buf(),
                context: format!("read-only and the flag could not be cleared: {e}"),
            }
        })?;
    }
    Ok(())
}

#[cfg(unix)]
fn clear_readonly(path: &Path, permissions: fs::Permissions) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = permissions.mode() | 0o200;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn clear_readonly(path: &Path, mut permissions: fs::Permissions) -> io::Result<()> {
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}

fn check_free_space(destination_dir: &Path, size: u64) -> TrieurResult<()> {
    let probe = nearest_existing_ancestor(destination_dir);
    let available = fs2::available_space(probe).map_err(|e| TrieurError::MoveFailed {
        path: destination_dir.to_path_buf(),
        reason: format!("cannot query free space: {e}"),
    })?;
    ensure_space(destination_dir, size, available)
}

fn ensure_space(destination_dir: &Path, size: u64, available: u64) -> TrieurResult<()> {
    let required = required_with_margin(size);
    if available < required {
        return Err(TrieurError::InsufficientSpace {
            required,
            available,
            dest: destination_dir.to_path_buf(),
        });
    }
    Ok(())
}

fn nearest_existing_ancestor(path: &Path) -> &Path {
    path.ancestors()
        .find(|p| p.exists())
        .unwrap_or(path)
}

/// Creates the missing levels of `destination_dir`, shallowest first, logging
/// each one right after it is created.
fn create_dir_tree(destination_dir: &Path, log: &mut RollbackLog) -> TrieurResult<()> {
    let mut missing: Vec<&Path> = destination_dir
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .collect();
    missing.reverse();

    for dir in missing {
        match fs::create_dir(dir) {
            Ok(()) => log.record_directory(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(TrieurError::PermissionDenied {
                    path: dir.to_path_buf(),
                    context: format!("cannot create directory: {e}"),
                });
            }
            Err(e) => {
                return Err(TrieurError::MoveFailed {
                    path: dir.to_path_buf(),
                    reason: format!("cannot create directory: {e}"),
                });
            }
        }
    }
    Ok(())
}
