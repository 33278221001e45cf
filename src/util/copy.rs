//! Recursive directory copy for publishing build output.

use std::fs;
use std::path::Path;

use crate::errors::CorvusError;

/// Recursively copy the contents of `src` into `dest`.
///
/// `dest` is removed and recreated first so files deleted between deploys
/// do not survive from the previous publish. Symlinks and non-regular
/// files (device nodes, FIFOs, sockets) are rejected: a symlink in
/// untrusted build output can point outside the tree, a FIFO blocks the
/// copier indefinitely, and a device node can surface kernel data.
/// Permission bits are preserved; ownership, timestamps, and xattrs are not.
pub fn copy_directory(src: &Path, dest: &Path) -> Result<(), CorvusError> {
    let src_meta = fs::metadata(src)?;
    if !src_meta.is_dir() {
        return Err(CorvusError::UnsupportedEntryType(format!(
            "source path {} is not a directory",
            src.display()
        )));
    }

    if dest.exists() {
        fs::remove_dir_all(dest)?;
    }
    fs::create_dir_all(dest)?;

    copy_tree(src, dest)
}

fn copy_tree(src: &Path, dest: &Path) -> Result<(), CorvusError> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        // symlink_metadata does not follow links, so a symlinked directory
        // is caught here instead of being traversed.
        let file_type = fs::symlink_metadata(&src_path)?.file_type();

        if file_type.is_symlink() {
            return Err(CorvusError::UnsupportedEntryType(format!(
                "symlink not allowed in deployment output: {}",
                src_path.display()
            )));
        }

        if file_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
            copy_tree(&src_path, &dest_path)?;
        } else if file_type.is_file() {
            // fs::copy preserves the source permission bits.
            fs::copy(&src_path, &dest_path)?;
        } else {
            return Err(CorvusError::UnsupportedEntryType(format!(
                "unsupported file type in deployment output: {}",
                src_path.display()
            )));
        }
    }

    Ok(())
}
