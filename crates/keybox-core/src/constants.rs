//! Core constants for the keybox controller.
//!
//! This module collects every fixed value the controller relies on: the
//! persisted record format, the default hardware bus identities, serial
//! settings, file names and the timing defaults used by the session loop.
//!
//! # Record Format
//!
//! Authorized entries and access log lines share one flat format:
//!
//! ```text
//! <tagid>_<timestamp>[_<suffix>...]
//! ```
//!
//! Only the portion before the first [`ENTRY_SEPARATOR`] identifies the tag.
//!
//! # Usage
//!
//! ```
//! use keybox_core::constants::*;
//!
//! let line = "12345_01Jan2024_10:00";
//! let tag = line.split(ENTRY_SEPARATOR).next().unwrap();
//! assert_eq!(tag, "12345");
//! assert_eq!(MAX_LOG_ENTRIES, 20);
//! ```
//!
//! All timing values are defaults only; the controller reads the effective
//! values from its configuration.

// ============================================================================
// Record Format
// ============================================================================

/// Separator between the tag identifier and the timestamp in a record.
pub const ENTRY_SEPARATOR: char = '_';

/// `chrono` format string for enrollment and log timestamps.
///
/// Produces values such as `16October2026_14:05`.
pub const TIMESTAMP_FORMAT: &str = "%d%B%Y_%H:%M";

/// Characters stripped from both ends of a completed scan.
///
/// Magnetic and RFID keyboard-wedge readers commonly frame their payload
/// with track sentinels (`;` start, `?` end).
pub const TAG_TRIM_CHARS: &[char] = &[';', '?'];

// ============================================================================
// Hardware Identities
// ============================================================================

/// USB vendor id of the RFID keyboard-wedge reader.
pub const DEFAULT_READER_VENDOR_ID: u16 = 0x0801;

/// USB product id of the RFID keyboard-wedge reader.
pub const DEFAULT_READER_PRODUCT_ID: u16 = 0x0001;

/// USB vendor id of the lock microcontroller (Arduino).
pub const DEFAULT_LINK_VENDOR_ID: u16 = 0x2341;

/// USB product id of the lock microcontroller (Arduino Uno).
pub const DEFAULT_LINK_PRODUCT_ID: u16 = 0x0043;

// ============================================================================
// Serial Settings
// ============================================================================

/// Baud rate of the microcontroller serial link.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout of the microcontroller serial link, in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

// ============================================================================
// Storage
// ============================================================================

/// Default file name of the authorized ID list.
pub const ID_FILE_NAME: &str = "idlist.txt";

/// Default file name of the access log.
pub const LOG_FILE_NAME: &str = "keybox_log.txt";

/// Number of log lines tolerated before the log is trimmed.
pub const MAX_LOG_ENTRIES: usize = 20;

// ============================================================================
// Timing (milliseconds)
// ============================================================================

/// Interval of the session multiplexer tick.
pub const DEFAULT_TICK_MS: u64 = 100;

/// Pause between discovery attempts while hardware is missing.
pub const DEFAULT_DISCOVERY_RETRY_MS: u64 = 5000;

/// Settle delay between opening the link and sending `PI_READY`.
pub const DEFAULT_LINK_SETTLE_MS: u64 = 3000;

/// Settle delay between finding the reader and sending `RFID_READY`.
pub const DEFAULT_READER_SETTLE_MS: u64 = 2000;

/// Settle delay between `UPDATE_MODE` and `UPDATE_READY`.
pub const DEFAULT_UPDATE_SETTLE_MS: u64 = 3000;

/// Settle delay after `EXIT_UPDATE` before the loop resumes.
pub const DEFAULT_ENROLLMENT_SETTLE_MS: u64 = 3000;

/// Upper bound on the wait for the microcontroller's reply to `OPEN_LOCK`.
pub const DEFAULT_LOCK_RESPONSE_TIMEOUT_MS: u64 = 4000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_format_has_no_leading_separator() {
        assert!(!TIMESTAMP_FORMAT.starts_with(ENTRY_SEPARATOR));
    }

    #[test]
    fn test_settle_delays_fit_inside_discovery_retry() {
        assert!(DEFAULT_LINK_SETTLE_MS <= DEFAULT_DISCOVERY_RETRY_MS);
        assert!(DEFAULT_READER_SETTLE_MS <= DEFAULT_DISCOVERY_RETRY_MS);
        assert!(DEFAULT_TICK_MS < DEFAULT_READ_TIMEOUT_MS);
    }
}
