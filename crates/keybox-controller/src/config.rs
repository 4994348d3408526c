//! Controller configuration.
//!
//! [`KeyboxConfig`] carries every value the controller used to take from
//! module-level constants: device identities, serial settings, file locations
//! and timing. All sections deserialize with defaults, so a JSON file only
//! needs the keys it overrides.
//!
//! ```
//! use keybox_controller::KeyboxConfig;
//!
//! let config = KeyboxConfig::from_json_str(r#"{ "timing": { "tick_ms": 50 } }"#).unwrap();
//! assert_eq!(config.timing.tick_ms, 50);
//! assert_eq!(config.timing.discovery_retry_ms, 5000);
//! assert_eq!(config.storage.max_log_entries, 20);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use keybox_core::constants::{
    DEFAULT_DISCOVERY_RETRY_MS, DEFAULT_ENROLLMENT_SETTLE_MS, DEFAULT_LINK_SETTLE_MS,
    DEFAULT_LOCK_RESPONSE_TIMEOUT_MS, DEFAULT_READER_SETTLE_MS, DEFAULT_TICK_MS,
    DEFAULT_UPDATE_SETTLE_MS, ID_FILE_NAME, LOG_FILE_NAME, MAX_LOG_ENTRIES,
};
use keybox_core::{BusIdentity, Error, Result};
use keybox_hardware::SerialSettings;
use keybox_storage::{AccessLog, AuthorizationStore};
use serde::{Deserialize, Serialize};

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboxConfig {
    /// Bus identity of the RFID reader.
    pub reader: BusIdentity,

    /// Bus identity of the lock microcontroller.
    pub control_link: BusIdentity,

    pub serial: SerialSettings,
    pub storage: StorageConfig,
    pub timing: TimingConfig,
}

impl Default for KeyboxConfig {
    fn default() -> Self {
        Self {
            reader: BusIdentity::reader(),
            control_link: BusIdentity::control_link(),
            serial: SerialSettings::default(),
            storage: StorageConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl KeyboxConfig {
    /// Parse a JSON document, filling missing keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is not valid JSON or a value
    /// has the wrong type.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config` if
    /// it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Pretty-printed JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Resolve relative storage paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.base_dir = Some(dir.into());
        self
    }
}

/// Location and cap of the persisted files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory relative file names resolve against. `None` means the
    /// process working directory.
    pub base_dir: Option<PathBuf>,

    pub id_file: PathBuf,
    pub log_file: PathBuf,

    /// Log line count past which the log is trimmed.
    pub max_log_entries: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            id_file: PathBuf::from(ID_FILE_NAME),
            log_file: PathBuf::from(LOG_FILE_NAME),
            max_log_entries: MAX_LOG_ENTRIES,
        }
    }
}

impl StorageConfig {
    fn resolve(&self, file: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if file.is_relative() => base.join(file),
            _ => file.to_path_buf(),
        }
    }

    /// Effective path of the authorized ID list.
    pub fn id_path(&self) -> PathBuf {
        self.resolve(&self.id_file)
    }

    /// Effective path of the access log.
    pub fn log_path(&self) -> PathBuf {
        self.resolve(&self.log_file)
    }

    pub fn authorization_store(&self) -> AuthorizationStore {
        AuthorizationStore::new(self.id_path())
    }

    pub fn access_log(&self) -> AccessLog {
        AccessLog::new(self.log_path(), self.max_log_entries)
    }
}

/// Session timing, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Idle tick of the session loop.
    pub tick_ms: u64,

    /// Wait between startup discovery or ID list load attempts.
    pub discovery_retry_ms: u64,

    /// Pause between opening the link and sending `PI_READY`.
    pub link_settle_ms: u64,

    /// Pause between finding the reader and sending `RFID_READY`.
    pub reader_settle_ms: u64,

    /// Pause between `UPDATE_MODE` and `UPDATE_READY`.
    pub update_settle_ms: u64,

    /// Pause after `EXIT_UPDATE`.
    pub enrollment_settle_ms: u64,

    /// Upper bound on waiting for the reply to `OPEN_LOCK`.
    pub lock_response_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            discovery_retry_ms: DEFAULT_DISCOVERY_RETRY_MS,
            link_settle_ms: DEFAULT_LINK_SETTLE_MS,
            reader_settle_ms: DEFAULT_READER_SETTLE_MS,
            update_settle_ms: DEFAULT_UPDATE_SETTLE_MS,
            enrollment_settle_ms: DEFAULT_ENROLLMENT_SETTLE_MS,
            lock_response_timeout_ms: DEFAULT_LOCK_RESPONSE_TIMEOUT_MS,
        }
    }
}

impl TimingConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn discovery_retry(&self) -> Duration {
        Duration::from_millis(self.discovery_retry_ms)
    }

    pub fn link_settle(&self) -> Duration {
        Duration::from_millis(self.link_settle_ms)
    }

    pub fn reader_settle(&self) -> Duration {
        Duration::from_millis(self.reader_settle_ms)
    }

    pub fn update_settle(&self) -> Duration {
        Duration::from_millis(self.update_settle_ms)
    }

    pub fn enrollment_settle(&self) -> Duration {
        Duration::from_millis(self.enrollment_settle_ms)
    }

    pub fn lock_response_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_response_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = KeyboxConfig::default();

        assert_eq!(config.reader, BusIdentity::new(0x0801, 0x0001));
        assert_eq!(config.control_link, BusIdentity::new(0x2341, 0x0043));
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.timing.tick(), Duration::from_millis(100));
        assert_eq!(config.timing.discovery_retry(), Duration::from_secs(5));
        assert_eq!(config.timing.reader_settle(), Duration::from_secs(2));
        assert_eq!(config.storage.id_path(), PathBuf::from("idlist.txt"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = KeyboxConfig::from_json_str(
            r#"{ "control_link": { "vendor_id": 6790, "product_id": 29987 },
                 "storage": { "max_log_entries": 5 } }"#,
        )
        .unwrap();

        assert_eq!(config.control_link, BusIdentity::new(0x1a86, 0x7523));
        assert_eq!(config.reader, BusIdentity::reader());
        assert_eq!(config.storage.max_log_entries, 5);
        assert_eq!(config.storage.id_file, PathBuf::from("idlist.txt"));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = KeyboxConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_base_dir_resolves_relative_paths_only() {
        let mut config = KeyboxConfig::default().with_base_dir("/opt/keybox");
        config.storage.log_file = PathBuf::from("/var/log/keybox.txt");

        assert_eq!(
            config.storage.id_path(),
            PathBuf::from("/opt/keybox/idlist.txt")
        );
        assert_eq!(
            config.storage.log_path(),
            PathBuf::from("/var/log/keybox.txt")
        );
    }

    #[test]
    fn test_json_round_trip_of_defaults() {
        let config = KeyboxConfig::default();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(KeyboxConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = KeyboxConfig::load(&dir.path().join("keybox.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
