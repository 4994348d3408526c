//! Line-oriented flat files with atomic full rewrites.
//!
//! Every mutation rewrites the whole file: the new content goes to a temporary
//! file in the same directory, which is then renamed over the target. A crash
//! mid-write leaves either the old or the new file, never a truncated one.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::{StorageError, StorageResult};

/// Read every non-blank line of `path`, trimmed of surrounding whitespace.
///
/// # Errors
///
/// Returns `StorageError::NotFound` if the file is missing and
/// `StorageError::Io` for any other read failure.
pub fn read_lines(path: &Path) -> StorageResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| StorageError::from_io(path, e))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Like [`read_lines`], but a missing file reads as empty.
///
/// # Errors
///
/// Returns `StorageError::Io` for failures other than a missing file.
pub fn read_lines_or_empty(path: &Path) -> StorageResult<Vec<String>> {
    match read_lines(path) {
        Err(StorageError::NotFound { .. }) => Ok(Vec::new()),
        other => other,
    }
}

/// Atomically replace `path` with `lines`, each newline-terminated.
///
/// # Errors
///
/// Returns `StorageError::Io` if the temporary file cannot be written or
/// renamed into place.
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let io_err = |e: std::io::Error| StorageError::from_io(path, e);

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        for line in lines {
            writeln!(writer, "{}", line.as_ref()).map_err(io_err)?;
        }
        writer.flush().map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    trace!(path = %path.display(), lines = lines.len(), "File rewritten");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");

        write_lines(&path, &["a_1", "b_2"]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a_1\nb_2\n");
        assert_eq!(read_lines(&path).unwrap(), vec!["a_1", "b_2"]);
    }

    #[test]
    fn test_read_skips_blank_lines_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "  a_1 \r\n\n\nb_2").unwrap();

        assert_eq!(read_lines(&path).unwrap(), vec!["a_1", "b_2"]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        assert!(read_lines(&path).unwrap_err().is_not_found());
        assert!(read_lines_or_empty(&path).unwrap().is_empty());
    }

    #[test]
    fn test_write_empty_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "old\n").unwrap();

        write_lines::<&str>(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("list.txt");

        let err = write_lines(&path, &["x"]).unwrap_err();
        assert!(err.io_kind().is_some());
    }
}
