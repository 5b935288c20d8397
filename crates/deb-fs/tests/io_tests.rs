use deb_fs::io;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

#[rstest]
#[case::new_file_in_new_directory(None, b"Source: foo\n".as_slice())]
#[case::overwrite(Some("Source: old\n"), b"Source: new\n".as_slice())]
#[case::crlf_and_trailing_blanks(Some("Source: old\n"), b"Source: foo\r\nTestsuite: autopkgtest  ".as_slice())]
fn test_write_atomic(#[case] existing: Option<&str>, #[case] content: &[u8]) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("debian").join("control");
    if let Some(existing) = existing {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, existing).unwrap();
    }

    io::write_atomic(&path, content).unwrap();

    assert_eq!(fs::read(&path).unwrap(), content);
}

#[test]
fn test_read_text_existing_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("changelog");
    fs::write(&path, "hello").unwrap();

    assert_eq!(io::read_text(&path).unwrap(), "hello");
}

#[test]
fn test_read_text_nonexistent_file() {
    let temp = TempDir::new().unwrap();
    let err = io::read_text(&temp.path().join("missing")).unwrap_err();
    assert!(err.is_not_found());
}

#[rstest]
#[case::present(Some("Source: foo\n"))]
#[case::absent(None)]
fn test_read_text_if_exists(#[case] content: Option<&str>) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("watch");
    if let Some(content) = content {
        fs::write(&path, content).unwrap();
    }
    assert_eq!(io::read_text_if_exists(&path).unwrap().as_deref(), content);
}

#[test]
fn test_remove_if_exists_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("control");
    fs::write(&path, "Source: foo\n").unwrap();

    io::remove_if_exists(&path).unwrap();
    io::remove_if_exists(&path).unwrap();
    assert!(!path.exists());
}

#[cfg(unix)]
#[test]
fn test_write_atomic_to_readonly_directory_leaves_original() {
    use std::os::unix::fs::PermissionsExt;

    // root bypasses permission checks
    let is_root = std::process::Command::new("id")
        .arg("-u")
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).trim() == "0")
        .unwrap_or(false);
    if is_root {
        return;
    }

    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("debian");
    fs::create_dir(&dir).unwrap();
    let path = dir.join("control");
    fs::write(&path, "Source: foo\n").unwrap();
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

    let result = io::write_atomic(&path, b"Source: bar\n");

    fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "Source: foo\n");
}
