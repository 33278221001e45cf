//! Zip extraction safety tests, including adversarial archives.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use corvus::errors::CorvusError;
use corvus::source::zip::extract_zip;

fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
    let file = fs::File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    for (name, body) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(name.trim_end_matches('/'), SimpleFileOptions::default())
                .unwrap();
        } else {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body).unwrap();
        }
    }
    writer.finish().unwrap();
}

#[test]
fn extracts_files_and_directories() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("site.zip");
    write_archive(
        &archive,
        &[
            ("index.html", b"<h1>OK</h1>".as_slice()),
            ("assets/", b"".as_slice()),
            ("assets/app.js", b"console.log('hi')".as_slice()),
        ],
    );

    let dest = dir.path().join("extracted");
    extract_zip(&archive, &dest).unwrap();

    assert_eq!(
        fs::read_to_string(dest.join("index.html")).unwrap(),
        "<h1>OK</h1>"
    );
    assert_eq!(
        fs::read_to_string(dest.join("assets/app.js")).unwrap(),
        "console.log('hi')"
    );
}

#[test]
fn creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("deep.zip");
    // No explicit directory entries at all.
    write_archive(&archive, &[("a/b/c/page.html", b"deep".as_slice())]);

    let dest = dir.path().join("extracted");
    extract_zip(&archive, &dest).unwrap();
    assert_eq!(fs::read_to_string(dest.join("a/b/c/page.html")).unwrap(), "deep");
}

#[test]
fn rejects_parent_traversal_entries() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("evil.zip");
    write_archive(
        &archive,
        &[
            ("index.html", b"ok".as_slice()),
            ("../evil.txt", b"escaped".as_slice()),
        ],
    );

    let dest = dir.path().join("extract-root").join("target");
    fs::create_dir_all(dest.parent().unwrap()).unwrap();

    let err = extract_zip(&archive, &dest).unwrap_err();
    assert!(matches!(err, CorvusError::ArchiveEscape(_)));

    // Nothing may exist outside the target directory.
    assert!(!dir.path().join("extract-root").join("evil.txt").exists());
    assert!(!dir.path().join("evil.txt").exists());
}

#[test]
fn rejects_absolute_path_entries() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("abs.zip");
    write_archive(&archive, &[("/etc/evil.conf", b"escaped".as_slice())]);

    let dest = dir.path().join("extracted");
    let err = extract_zip(&archive, &dest).unwrap_err();
    assert!(matches!(err, CorvusError::ArchiveEscape(_)));
}

#[test]
fn refuses_pre_existing_destination() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("site.zip");
    write_archive(&archive, &[("index.html", b"ok".as_slice())]);

    let dest = dir.path().join("already-there");
    fs::create_dir_all(&dest).unwrap();

    let err = extract_zip(&archive, &dest).unwrap_err();
    assert!(matches!(err, CorvusError::InvalidRequest(_)));
}

#[test]
fn garbage_archive_is_rejected() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("not-a.zip");
    fs::write(&archive, b"this is not a zip file").unwrap();

    let dest = dir.path().join("extracted");
    let err = extract_zip(&archive, &dest).unwrap_err();
    assert!(matches!(err, CorvusError::InvalidRequest(_)));
}

#[cfg(unix)]
#[test]
fn preserves_stored_unix_modes() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("modes.zip");
    let file = fs::File::create(&archive).unwrap();
    let mut writer = ZipWriter::new(file);
    writer
        .start_file(
            "run.sh",
            SimpleFileOptions::default().unix_permissions(0o755),
        )
        .unwrap();
    writer.write_all(b"#!/bin/sh\n").unwrap();
    writer.finish().unwrap();

    let dest = dir.path().join("extracted");
    extract_zip(&archive, &dest).unwrap();

    let mode = fs::metadata(dest.join("run.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}
