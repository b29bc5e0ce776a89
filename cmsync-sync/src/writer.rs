//! Entry writer and the real-filesystem sink.
//!
//! ## `write_entry` protocol
//!
//! 1. Resolve `<write_dir>/<key>`; reject keys that are not a plain file name.
//! 2. `Sink::create` the target (truncating any previous content).
//! 3. Write the whole value through the handle in one call.
//! 4. Drop the handle before the caller moves on to the next entry.
//!
//! There is no temp file and no rename: every pass overwrites in place.

use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use cmsync_core::{FileHandle, ObjectName, Sink};

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: usize,
}

// ---------------------------------------------------------------------------
// FsSink
// ---------------------------------------------------------------------------

/// [`Sink`] backed by `std::fs::File::create`.
///
/// Parent directories are never created; a missing write directory is an
/// I/O error like any other.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl Sink for FsSink {
    type Handle = File;

    fn create(&mut self, path: &Path) -> io::Result<File> {
        File::create(path)
    }
}

// ---------------------------------------------------------------------------
// target_path / write_entry
// ---------------------------------------------------------------------------

/// Resolve the target file for `key` of `object`.
pub(crate) fn target_path(
    write_dir: &Path,
    object: &ObjectName,
    key: &str,
) -> Result<PathBuf, SyncError> {
    let mut components = Path::new(key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == key => Ok(write_dir.join(key)),
        _ => Err(SyncError::InvalidKey {
            object: object.clone(),
            key: key.to_string(),
        }),
    }
}

/// Create `path` through `sink` and write `content` to it.
pub(crate) fn write_entry<S: Sink>(
    sink: &mut S,
    path: &Path,
    content: &str,
) -> Result<WrittenFile, SyncError> {
    let mut handle = sink.create(path).map_err(|e| io_err(path, e))?;
    let bytes = handle.write_content(content).map_err(|e| io_err(path, e))?;
    drop(handle);

    tracing::debug!("wrote {} bytes: {}", bytes, path.display());
    Ok(WrittenFile {
        path: path.to_path_buf(),
        bytes,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cmsync_core::MemorySink;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn obj() -> ObjectName {
        ObjectName::from("app-config")
    }

    #[test]
    fn first_write_creates_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("app.properties");
        let result = write_entry(&mut FsSink, &path, "hello").unwrap();
        assert_eq!(result.bytes, 5);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn second_write_truncates_previous_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.conf");
        write_entry(&mut FsSink, &path, "a much longer first version").unwrap();
        write_entry(&mut FsSink, &path, "v2").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "v2");
    }

    #[test]
    fn content_is_written_verbatim() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("crlf.txt");
        write_entry(&mut FsSink, &path, "line1\r\nline2").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"line1\r\nline2");
    }

    #[test]
    fn empty_value_creates_empty_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty");
        let result = write_entry(&mut FsSink, &path, "").unwrap();
        assert_eq!(result.bytes, 0);
        assert!(path.exists());
    }

    #[test]
    fn missing_directory_is_io_error_with_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope").join("file");
        let err = write_entry(&mut FsSink, &path, "x").unwrap_err();
        match err {
            SyncError::Io { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected io error, got {other:?}"),
        }
        assert!(!tmp.path().join("nope").exists(), "parents must not be created");
    }

    #[test]
    fn write_failure_is_io_error() {
        let mut sink = MemorySink::new();
        sink.fail_write("/data/full");
        let err = write_entry(&mut sink, Path::new("/data/full"), "x").unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }

    #[test]
    fn target_path_joins_write_dir() {
        let path = target_path(Path::new("/foo"), &obj(), "bar").unwrap();
        assert_eq!(path, PathBuf::from("/foo/bar"));
    }

    #[rstest]
    #[case::empty("")]
    #[case::current(".")]
    #[case::parent("..")]
    #[case::nested("a/b")]
    #[case::absolute("/etc/passwd")]
    #[case::trailing_slash("name/")]
    fn target_path_rejects_non_file_names(#[case] key: &str) {
        let err = target_path(Path::new("/foo"), &obj(), key).unwrap_err();
        assert!(matches!(err, SyncError::InvalidKey { .. }), "key {key:?}");
    }

    #[test]
    fn dotted_keys_are_plain_file_names() {
        let path = target_path(Path::new("/foo"), &obj(), ".env").unwrap();
        assert_eq!(path, PathBuf::from("/foo/.env"));
        let path = target_path(Path::new("/foo"), &obj(), "game.properties").unwrap();
        assert_eq!(path, PathBuf::from("/foo/game.properties"));
    }

    #[test]
    #[cfg(unix)]
    fn readonly_directory_fails_create() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();
        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let path = readonly_dir.join("file");
        let result = write_entry(&mut FsSink, &path, "x");

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Root ignores directory permissions; only assert when the write failed.
        if let Err(err) = result {
            assert!(matches!(err, SyncError::Io { .. }));
            assert!(!path.exists());
        }
    }
}
