//! Scan assembly from reader key events.
//!
//! A keyboard-wedge reader types the tag as digit keys followed by Enter.
//! [`ScanAssembler`] buffers digits across session ticks and emits a
//! [`TagId`] when a terminator arrives.

use keybox_core::TagId;
use keybox_hardware::KeyInput;
use tracing::{debug, trace};

/// Pending scan buffer.
#[derive(Debug, Default, Clone)]
pub struct ScanAssembler {
    buffer: String,
}

impl ScanAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key-down event.
    ///
    /// Returns the completed tag when `key` is a terminator and the buffer
    /// held something. The buffer is cleared on every terminator.
    pub fn push(&mut self, key: KeyInput) -> Option<TagId> {
        if key.is_terminator() {
            if self.buffer.is_empty() {
                return None;
            }

            let raw = std::mem::take(&mut self.buffer);
            return match TagId::new(&raw) {
                Ok(tag) => Some(tag),
                Err(e) => {
                    debug!(raw = %raw, "Discarding scan: {}", e);
                    None
                }
            };
        }

        match key.as_char() {
            Some(c) => self.buffer.extend(c.to_lowercase()),
            None => trace!(?key, "Ignoring key"),
        }
        None
    }

    /// Characters buffered since the last terminator.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn feed(assembler: &mut ScanAssembler, keys: &[KeyInput]) -> Vec<TagId> {
        keys.iter().filter_map(|k| assembler.push(*k)).collect()
    }

    #[rstest]
    #[case(KeyInput::Enter)]
    #[case(KeyInput::KeypadEnter)]
    fn test_terminators_complete_scan(#[case] terminator: KeyInput) {
        let mut assembler = ScanAssembler::new();
        let tags = feed(
            &mut assembler,
            &[KeyInput::Digit(1), KeyInput::Digit(2), terminator],
        );

        assert_eq!(tags, vec![TagId::new("12").unwrap()]);
        assert!(assembler.is_empty());
    }

    #[test]
    fn test_terminator_on_empty_buffer_emits_nothing() {
        let mut assembler = ScanAssembler::new();
        assert!(assembler.push(KeyInput::Enter).is_none());
        assert!(assembler.push(KeyInput::KeypadEnter).is_none());
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let mut assembler = ScanAssembler::new();
        let tags = feed(
            &mut assembler,
            &[
                KeyInput::Other(39),
                KeyInput::Digit(5),
                KeyInput::Other(53),
                KeyInput::Digit(6),
                KeyInput::Enter,
            ],
        );

        assert_eq!(tags, vec![TagId::new("56").unwrap()]);
    }

    #[test]
    fn test_buffer_persists_until_terminator() {
        let mut assembler = ScanAssembler::new();
        assembler.push(KeyInput::Digit(4));
        assembler.push(KeyInput::Digit(2));

        assert_eq!(assembler.pending(), "42");
        assert_eq!(
            assembler.push(KeyInput::Enter),
            Some(TagId::new("42").unwrap())
        );
        assert_eq!(assembler.pending(), "");
    }

    #[test]
    fn test_consecutive_scans_are_independent() {
        let mut assembler = ScanAssembler::new();
        let tags = feed(
            &mut assembler,
            &[
                KeyInput::Digit(1),
                KeyInput::Enter,
                KeyInput::Digit(2),
                KeyInput::Enter,
            ],
        );

        assert_eq!(
            tags,
            vec![TagId::new("1").unwrap(), TagId::new("2").unwrap()]
        );
    }

    proptest! {
        #[test]
        fn prop_digit_sequence_round_trips(digits in proptest::collection::vec(0u8..10, 1..32)) {
            let mut assembler = ScanAssembler::new();
            for d in &digits {
                prop_assert!(assembler.push(KeyInput::Digit(*d)).is_none());
            }

            let tag = assembler.push(KeyInput::Enter);
            let expected: String = digits.iter().map(|d| char::from(b'0' + d)).collect();

            prop_assert_eq!(tag.map(|t| t.as_str().to_string()), Some(expected));
            prop_assert!(assembler.is_empty());
        }
    }
}
