//! Zip extraction with zip-slip protection.

use std::fs;
use std::io;
use std::path::Path;

use zip::ZipArchive;

use crate::errors::CorvusError;

/// Extract a zip archive into `dest_dir`, which must not already exist.
///
/// Zip entries can carry `..` components or absolute paths that would
/// write outside the destination (zip slip). Every entry path is resolved
/// and checked for containment before anything touches the disk. Symlinks
/// and non-regular entries are rejected outright: served content must be
/// plain files and directories.
///
/// Extraction is blocking work; callers run it under `spawn_blocking`.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), CorvusError> {
    if dest_dir.exists() {
        return Err(CorvusError::InvalidRequest(format!(
            "extraction directory {} already exists",
            dest_dir.display()
        )));
    }
    fs::create_dir_all(dest_dir)?;

    let file = fs::File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| CorvusError::InvalidRequest(format!("failed to open zip archive: {e}")))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| {
            CorvusError::InvalidRequest(format!("failed to read zip entry {index}: {e}"))
        })?;

        let entry_name = entry.name().to_string();

        // enclosed_name resolves the entry path and refuses `..` segments
        // and absolute paths; anything it rejects would have escaped.
        let relative = match entry.enclosed_name() {
            Some(path) => path,
            None => return Err(CorvusError::ArchiveEscape(entry_name)),
        };
        let dest_path = dest_dir.join(&relative);
        if !dest_path.starts_with(dest_dir) {
            return Err(CorvusError::ArchiveEscape(entry_name));
        }

        if let Some(mode) = entry.unix_mode() {
            let file_type = mode & 0o170000;
            // regular file, directory, or no stored type are acceptable;
            // symlinks, FIFOs, sockets, and device nodes are not.
            if file_type != 0 && file_type != 0o100000 && file_type != 0o040000 {
                return Err(CorvusError::UnsupportedEntryType(entry_name));
            }
        }

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }

        // Archives may list files without explicit directory entries.
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = fs::File::create(&dest_path)?;
        io::copy(&mut entry, &mut out)?;

        // Entry modes from unix-built archives are preserved; archives
        // built on Windows store zero, which falls back to rw-r--r--.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = match entry.unix_mode() {
                Some(mode) if mode & 0o777 != 0 => fs::Permissions::from_mode(mode & 0o777),
                _ => fs::Permissions::from_mode(0o644),
            };
            fs::set_permissions(&dest_path, permissions)?;
        }
    }

    Ok(())
}
