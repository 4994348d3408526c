//! Common types shared across hardware device implementations.
//!
//! This module defines the key input produced by readers, the serial
//! settings of the control link and descriptive device metadata.

use keybox_core::BusIdentity;
use keybox_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{HardwareError, Result};

/// A key-down event from a keyboard-wedge reader.
///
/// Readers emulate a keyboard: the tag is typed as top-row digits followed
/// by Enter. Every other key is surfaced as `Other` with its raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum KeyInput {
    /// Top-row digit key (0-9).
    Digit(u8),

    /// Main Enter key.
    Enter,

    /// Numeric keypad Enter key.
    KeypadEnter,

    /// Any other key, by raw key code.
    Other(u16),
}

impl KeyInput {
    /// Create a digit input.
    ///
    /// # Errors
    ///
    /// Returns an error if the digit is greater than 9.
    ///
    /// # Examples
    ///
    /// ```
    /// use keybox_hardware::KeyInput;
    ///
    /// assert_eq!(KeyInput::digit(5).unwrap().as_char(), Some('5'));
    /// assert!(KeyInput::digit(10).is_err());
    /// ```
    pub fn digit(d: u8) -> Result<Self> {
        if d > 9 {
            return Err(HardwareError::invalid_data(format!(
                "Digit must be 0-9, got {}",
                d
            )));
        }
        Ok(Self::Digit(d))
    }

    /// Map a character to the key a reader would send for it.
    ///
    /// Digits map to `Digit`, `'\n'` and `'\r'` to `Enter`; anything else is
    /// not typeable and yields `None`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => c.to_digit(10).map(|d| Self::Digit(d as u8)),
            '\n' | '\r' => Some(Self::Enter),
            _ => None,
        }
    }

    /// Check if this key terminates a scan.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Self::Enter | Self::KeypadEnter)
    }

    /// Character appended to a scan buffer for this key, if any.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Digit(d) => char::from_digit(u32::from(*d), 10),
            _ => None,
        }
    }
}

/// Serial settings of the microcontroller link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Baud rate in bits per second.
    pub baud_rate: u32,

    /// Read timeout in milliseconds.
    pub read_timeout_ms: u64,
}

impl SerialSettings {
    /// Read timeout as a `Duration`.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

/// Generic device information.
///
/// Contains metadata about an opened device for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "Arduino Uno", "Mock Reader").
    pub name: String,

    /// Device node or port path.
    pub path: String,

    /// Bus identity the device was discovered with, if known.
    pub identity: Option<BusIdentity>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            identity: None,
        }
    }

    /// Set the bus identity.
    pub fn with_identity(mut self, identity: BusIdentity) -> Self {
        self.identity = Some(identity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_input_from_char() {
        assert_eq!(KeyInput::from_char('7'), Some(KeyInput::Digit(7)));
        assert_eq!(KeyInput::from_char('\n'), Some(KeyInput::Enter));
        assert_eq!(KeyInput::from_char('a'), None);
    }

    #[test]
    fn test_key_input_terminators() {
        assert!(KeyInput::Enter.is_terminator());
        assert!(KeyInput::KeypadEnter.is_terminator());
        assert!(!KeyInput::Digit(1).is_terminator());
        assert!(!KeyInput::Other(30).is_terminator());
    }

    #[test]
    fn test_key_input_as_char() {
        assert_eq!(KeyInput::Digit(0).as_char(), Some('0'));
        assert_eq!(KeyInput::Enter.as_char(), None);
        assert_eq!(KeyInput::Other(2).as_char(), None);
    }

    #[test]
    fn test_serial_settings_default() {
        let settings = SerialSettings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.read_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_serial_settings_partial_json() {
        let settings: SerialSettings = serde_json::from_str(r#"{"baud_rate":115200}"#).unwrap();
        assert_eq!(settings.baud_rate, 115200);
        assert_eq!(settings.read_timeout_ms, 1000);
    }

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new("Arduino", "/dev/ttyACM0")
            .with_identity(BusIdentity::control_link());

        assert_eq!(info.path, "/dev/ttyACM0");
        assert_eq!(info.identity, Some(BusIdentity::control_link()));
    }
}
