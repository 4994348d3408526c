//! Linux input-event reader driver.
//!
//! Keyboard-wedge RFID readers enumerate as USB HID keyboards and show up as
//! `/dev/input/event*` nodes. [`EvdevReader`] grabs the node exclusively so
//! the console does not also receive the typed digits, then surfaces key-down
//! events as [`KeyInput`].

use std::fmt;
use std::path::Path;

use evdev::{Device, EventStream, InputEventKind, Key};
use tracing::{debug, trace};

use crate::traits::KeySource;
use crate::{DeviceInfo, HardwareError, KeyInput, Result};

/// evdev value of a key-down event (0 is release, 2 is auto-repeat).
const KEY_DOWN: i32 = 1;

/// Top-row digit keys, indexed by digit value.
const DIGIT_KEYS: [Key; 10] = [
    Key::KEY_0,
    Key::KEY_1,
    Key::KEY_2,
    Key::KEY_3,
    Key::KEY_4,
    Key::KEY_5,
    Key::KEY_6,
    Key::KEY_7,
    Key::KEY_8,
    Key::KEY_9,
];

/// Map an evdev key code to reader input.
///
/// Keypad digits are deliberately not digits here: wedge readers type on the
/// top row, and only those keys contribute to a tag.
pub fn map_key(key: Key) -> KeyInput {
    if key == Key::KEY_ENTER {
        return KeyInput::Enter;
    }
    if key == Key::KEY_KPENTER {
        return KeyInput::KeypadEnter;
    }

    DIGIT_KEYS
        .iter()
        .position(|digit| *digit == key)
        .map_or(KeyInput::Other(key.code()), |d| KeyInput::Digit(d as u8))
}

/// Exclusively grabbed evdev reader.
pub struct EvdevReader {
    stream: EventStream,
    info: DeviceInfo,
}

impl EvdevReader {
    /// Grab `device` and start streaming its events.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be grabbed (for example, another
    /// process holds it) or registered with the async runtime.
    pub fn open(mut device: Device, path: &Path) -> Result<Self> {
        let name = device.name().unwrap_or("RFID Reader").to_string();

        device.grab().map_err(|e| {
            HardwareError::initialization_failed(format!("cannot grab {}: {e}", path.display()))
        })?;

        let stream = device.into_event_stream()?;
        debug!(device = %name, path = %path.display(), "Reader grabbed");

        Ok(Self {
            stream,
            info: DeviceInfo::new(name, path.display().to_string()),
        })
    }

    /// Attach discovery metadata.
    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = info;
        self
    }
}

impl fmt::Debug for EvdevReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvdevReader")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl KeySource for EvdevReader {
    async fn next_key(&mut self) -> Result<KeyInput> {
        loop {
            let event = self.stream.next_event().await.map_err(|e| {
                HardwareError::disconnected(format!("{} ({e})", self.info.name))
            })?;

            if let InputEventKind::Key(key) = event.kind()
                && event.value() == KEY_DOWN
            {
                let input = map_key(key);
                trace!(?key, ?input, "Reader key down");
                return Ok(input);
            }
        }
    }

    fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_digit_keys() {
        for (d, key) in DIGIT_KEYS.iter().enumerate() {
            assert_eq!(map_key(*key), KeyInput::Digit(d as u8));
        }
    }

    #[test]
    fn test_map_terminators() {
        assert_eq!(map_key(Key::KEY_ENTER), KeyInput::Enter);
        assert_eq!(map_key(Key::KEY_KPENTER), KeyInput::KeypadEnter);
    }

    #[test]
    fn test_map_other_keys() {
        assert_eq!(map_key(Key::KEY_A), KeyInput::Other(Key::KEY_A.code()));
        assert_eq!(map_key(Key::KEY_KP1), KeyInput::Other(Key::KEY_KP1.code()));
        assert_eq!(
            map_key(Key::KEY_SEMICOLON),
            KeyInput::Other(Key::KEY_SEMICOLON.code())
        );
    }
}
