//! Authorized tag list backed by a flat file.
//!
//! One `<tagid>_<timestamp>` record per line. Entries are only ever appended
//! or wiped wholesale; membership is decided on the identifier portion alone.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use keybox_core::{AuthorizedEntry, TagId};
use tracing::{debug, info, warn};

use crate::error::StorageResult;
use crate::flatfile;

/// In-memory snapshot of the authorized list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedSet {
    entries: Vec<AuthorizedEntry>,
    tags: HashSet<TagId>,
}

impl AuthorizedSet {
    /// Build a set from parsed entries, keeping file order.
    pub fn from_entries(entries: Vec<AuthorizedEntry>) -> Self {
        let tags = entries.iter().map(|e| e.tag().clone()).collect();
        Self { entries, tags }
    }

    /// Check whether `tag` matches any stored identifier exactly.
    pub fn contains(&self, tag: &TagId) -> bool {
        self.tags.contains(tag)
    }

    /// Entries in file order.
    pub fn entries(&self) -> &[AuthorizedEntry] {
        &self.entries
    }

    /// Number of stored entries (duplicates included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flat-file authorization store.
#[derive(Debug, Clone)]
pub struct AuthorizationStore {
    path: PathBuf,
}

impl AuthorizationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the authorized list.
    ///
    /// Lines whose identifier portion is not a valid tag are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the file does not exist. Callers
    /// treat this as retryable.
    pub fn load(&self) -> StorageResult<AuthorizedSet> {
        let lines = flatfile::read_lines(&self.path)?;

        let entries: Vec<AuthorizedEntry> = lines
            .iter()
            .filter_map(|line| match AuthorizedEntry::parse(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(path = %self.path.display(), "Skipping unreadable entry: {}", e);
                    None
                }
            })
            .collect();

        debug!(path = %self.path.display(), count = entries.len(), "Authorized list loaded");
        Ok(AuthorizedSet::from_entries(entries))
    }

    /// Append one entry, rewriting the whole file.
    ///
    /// Existing lines are carried over verbatim. A missing file is created.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be read or replaced.
    pub fn append(&self, entry: &AuthorizedEntry) -> StorageResult<()> {
        let mut lines = flatfile::read_lines_or_empty(&self.path)?;
        lines.push(entry.to_string());
        flatfile::write_lines(&self.path, &lines)?;

        info!(tag = %entry.tag(), enrolled_at = entry.enrolled_at(), "Tag enrolled");
        Ok(())
    }

    /// Replace the file with an empty one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be replaced.
    pub fn wipe(&self) -> StorageResult<()> {
        flatfile::write_lines::<&str>(&self.path, &[])?;
        info!(path = %self.path.display(), "Authorized list wiped");
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
    use rstest::rstest;
    use std::fs;

    fn tag(s: &str) -> TagId {
        TagId::new(s).unwrap()
    }

    fn store_with(content: &str) -> (tempfile::TempDir, AuthorizationStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idlist.txt");
        fs::write(&path, content).unwrap();
        (dir, AuthorizationStore::new(path))
    }

    #[test]
    fn test_load_keeps_identifier_portion() {
        let (_dir, store) = store_with("12345_01Jan2024_10:00\n");
        let set = store.load().unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.contains(&tag("12345")));
        assert!(!set.contains(&tag("99999")));
        assert_eq!(set.entries()[0].enrolled_at(), "01Jan2024_10:00");
    }

    #[rstest]
    #[case("12345", true)]
    #[case("1234", false)]
    #[case("123456", false)]
    #[case("54321", true)]
    fn test_membership_is_exact(#[case] scanned: &str, #[case] expected: bool) {
        let (_dir, store) = store_with("12345_01Jan2024_10:00\n54321\n");
        assert_eq!(store.load().unwrap().contains(&tag(scanned)), expected);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthorizationStore::new(dir.path().join("idlist.txt"));

        assert!(store.load().unwrap_err().is_not_found());
    }

    #[test]
    fn test_load_skips_unreadable_lines() {
        let (_dir, store) = store_with("_nothing\n\n777_x\n");
        let set = store.load().unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.contains(&tag("777")));
    }

    #[test]
    fn test_append_preserves_existing_lines() {
        let (_dir, store) = store_with("12345_01Jan2024_10:00\n");
        store
            .append(&AuthorizedEntry::new(tag("54321"), "16October2026_14:05"))
            .unwrap();

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "12345_01Jan2024_10:00\n54321_16October2026_14:05\n"
        );
        let set = store.load().unwrap();
        assert!(set.contains(&tag("12345")));
        assert!(set.contains(&tag("54321")));
    }

    #[test]
    fn test_append_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthorizationStore::new(dir.path().join("idlist.txt"));

        store.append(&AuthorizedEntry::new(tag("1"), "t")).unwrap();
        assert!(store.load().unwrap().contains(&tag("1")));
    }

    #[test]
    fn test_wipe_twice_leaves_empty_file() {
        let (_dir, store) = store_with("12345_01Jan2024_10:00\n");

        store.wipe().unwrap();
        store.wipe().unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_ensure_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthorizationStore::new(dir.path().join("idlist.txt"));

        assert!(store.ensure_exists().unwrap());
        assert!(!store.ensure_exists().unwrap());
        assert!(store.load().unwrap().is_empty());
    }
}
