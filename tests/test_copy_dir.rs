//! Publish-copy semantics: completeness, stale-file removal, and rejection
//! of entries that must never reach the asset root.

use std::fs;

use tempfile::TempDir;

use corvus::errors::CorvusError;
use corvus::util::copy::copy_directory;

#[test]
fn copies_nested_trees_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("assets/img")).unwrap();
    fs::write(src.join("index.html"), "<h1>OK</h1>").unwrap();
    fs::write(src.join("assets/app.css"), "body{}").unwrap();
    fs::write(src.join("assets/img/logo.svg"), "<svg/>").unwrap();

    let dest = dir.path().join("dest");
    copy_directory(&src, &dest).unwrap();

    assert_eq!(fs::read_to_string(dest.join("index.html")).unwrap(), "<h1>OK</h1>");
    assert_eq!(fs::read_to_string(dest.join("assets/app.css")).unwrap(), "body{}");
    assert_eq!(
        fs::read_to_string(dest.join("assets/img/logo.svg")).unwrap(),
        "<svg/>"
    );
}

#[test]
fn stale_destination_files_do_not_survive() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("index.html"), "new deploy").unwrap();

    let dest = dir.path().join("dest");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("removed-page.html"), "old deploy").unwrap();

    copy_directory(&src, &dest).unwrap();

    assert!(!dest.join("removed-page.html").exists());
    assert_eq!(fs::read_to_string(dest.join("index.html")).unwrap(), "new deploy");
}

#[cfg(unix)]
#[test]
fn symlinks_are_rejected() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("index.html"), "ok").unwrap();
    std::os::unix::fs::symlink("/etc/passwd", src.join("link")).unwrap();

    let dest = dir.path().join("dest");
    let err = copy_directory(&src, &dest).unwrap_err();
    assert!(matches!(err, CorvusError::UnsupportedEntryType(_)));
}

#[cfg(unix)]
#[test]
fn permission_bits_are_preserved() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("run.sh"), "#!/bin/sh\n").unwrap();
    fs::set_permissions(src.join("run.sh"), fs::Permissions::from_mode(0o755)).unwrap();

    let dest = dir.path().join("dest");
    copy_directory(&src, &dest).unwrap();

    let mode = fs::metadata(dest.join("run.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[test]
fn source_must_be_a_directory() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("file.txt");
    fs::write(&src, "not a dir").unwrap();

    let err = copy_directory(&src, &dir.path().join("dest")).unwrap_err();
    assert!(matches!(err, CorvusError::UnsupportedEntryType(_)));
}
