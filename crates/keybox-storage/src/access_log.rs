//! Bounded access log.
//!
//! Each completed scan adds one `<tagid>_<timestamp>_<OUTCOME>` line. Once the
//! line count exceeds the cap, [`AccessLog::trim`] rewrites the file with only
//! the most recent line.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use keybox_core::constants::{ENTRY_SEPARATOR, MAX_LOG_ENTRIES, TIMESTAMP_FORMAT};
use keybox_core::{AccessOutcome, TagId};
use tracing::{debug, info};

use crate::error::StorageResult;
use crate::flatfile;

/// Format one access log line.
pub fn format_record<Tz>(tag: &TagId, outcome: AccessOutcome, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{tag}{sep}{ts}{sep}{outcome}",
        sep = ENTRY_SEPARATOR,
        ts = at.format(TIMESTAMP_FORMAT),
        outcome = outcome.as_str(),
    )
}

/// Flat-file access log.
#[derive(Debug, Clone)]
pub struct AccessLog {
    path: PathBuf,
    max_entries: usize,
}

impl AccessLog {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
        }
    }

    /// Log at `path` with the default cap.
    pub fn with_default_cap(path: impl Into<PathBuf>) -> Self {
        Self::new(path, MAX_LOG_ENTRIES)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lines, oldest first. A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file exists but cannot be read.
    pub fn lines(&self) -> StorageResult<Vec<String>> {
        flatfile::read_lines_or_empty(&self.path)
    }

    /// Append one raw line, rewriting the whole file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be read or replaced.
    pub fn append_line(&self, line: &str) -> StorageResult<()> {
        let mut lines = self.lines()?;
        lines.push(line.to_string());
        flatfile::write_lines(&self.path, &lines)
    }

    /// Record a scan outcome stamped with the current local time.
    ///
    /// # Errors
    ///
    /// Same as [`append_line`](Self::append_line).
    pub fn record(&self, tag: &TagId, outcome: AccessOutcome) -> StorageResult<()> {
        let line = format_record(tag, outcome, &Local::now());
        self.append_line(&line)?;
        debug!(%tag, %outcome, "Access recorded");
        Ok(())
    }

    /// Enforce the cap: past `max_entries` lines, keep only the last one.
    ///
    /// Returns `true` if the file was rewritten. A missing file counts as
    /// empty and is left alone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be read or replaced.
    pub fn trim(&self) -> StorageResult<bool> {
        let lines = self.lines()?;
        if lines.len() <= self.max_entries {
            return Ok(false);
        }

        let kept = &lines[lines.len() - 1..];
        flatfile::write_lines(&self.path, kept)?;

        info!(
            path = %self.path.display(),
            dropped = lines.len() - 1,
            "Access log trimmed"
        );
        Ok(true)
    }

    /// Replace the log with an empty file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be replaced.
    pub fn wipe(&self) -> StorageResult<()> {
        flatfile::write_lines::<&str>(&self.path, &[])?;
        info!(path = %self.path.display(), "Access log wiped");
        Ok(())
    }

    /// Create an empty file if none exists. Returns `true` if one was created.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be created.
    pub fn ensure_exists(&self) -> StorageResult<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        flatfile::write_lines::<&str>(&self.path, &[])?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;

    fn log_in(dir: &tempfile::TempDir) -> AccessLog {
        AccessLog::with_default_cap(dir.path().join("keybox_log.txt"))
    }

    #[test]
    fn test_format_record() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 14, 5, 0).unwrap();
        let tag = TagId::new("54321").unwrap();

        assert_eq!(
            format_record(&tag, AccessOutcome::Granted, &at),
            "54321_16October2026_14:05_GRANTED"
        );
    }

    #[test]
    fn test_twenty_first_line_leaves_one() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);

        for i in 0..20 {
            log.append_line(&format!("line{i}")).unwrap();
            assert!(!log.trim().unwrap());
        }
        assert_eq!(log.lines().unwrap().len(), 20);

        log.append_line("line20").unwrap();
        assert!(log.trim().unwrap());

        assert_eq!(log.lines().unwrap(), vec!["line20"]);
        assert_eq!(fs::read_to_string(log.path()).unwrap(), "line20\n");
    }

    #[test]
    fn test_trim_missing_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);

        assert!(!log.trim().unwrap());
        assert!(!log.path().exists());
    }

    #[test]
    fn test_record_appends_outcome_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);
        let tag = TagId::new("99999").unwrap();

        log.record(&tag, AccessOutcome::Denied).unwrap();

        let lines = log.lines().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("99999_"));
        assert!(lines[0].ends_with("_DENIED"));
    }

    #[test]
    fn test_wipe_and_ensure_exists() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);

        assert!(log.ensure_exists().unwrap());
        log.append_line("x").unwrap();
        log.wipe().unwrap();
        log.wipe().unwrap();

        assert!(log.lines().unwrap().is_empty());
        assert!(!log.ensure_exists().unwrap());
    }
}
