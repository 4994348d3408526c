//! Flat-file persistence for the keybox controller.
//!
//! Two plain text files, one record per line:
//!
//! - [`AuthorizationStore`]: the authorized list, `<tagid>_<timestamp>`
//! - [`AccessLog`]: one line per scan, capped by [`AccessLog::trim`]
//!
//! Every mutation is a full-file rewrite through [`flatfile::write_lines`],
//! which replaces the file atomically. This process is the only writer; no
//! locking is done against external writers.
//!
//! # Examples
//!
//! ```no_run
//! use keybox_core::{AuthorizedEntry, TagId};
//! use keybox_storage::AuthorizationStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = AuthorizationStore::new("idlist.txt");
//! let tag = TagId::new("54321")?;
//!
//! store.append(&AuthorizedEntry::enroll_now(tag.clone()))?;
//! assert!(store.load()?.contains(&tag));
//! # Ok(())
//! # }
//! ```

pub mod access_log;
pub mod authorization;
pub mod error;
pub mod flatfile;

pub use access_log::AccessLog;
pub use authorization::{AuthorizationStore, AuthorizedSet};
pub use error::{StorageError, StorageResult};
