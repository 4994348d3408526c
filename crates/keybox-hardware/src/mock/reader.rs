//! Mock keyboard-wedge reader for testing and development.

use tokio::sync::mpsc;

use crate::traits::KeySource;
use crate::{DeviceInfo, HardwareError, KeyInput, Result};

#[derive(Debug)]
enum ReaderEvent {
    Key(KeyInput),
    Fail,
}

/// Mock reader fed through a channel.
///
/// # Examples
///
/// ```
/// use keybox_hardware::mock::MockKeyReader;
/// use keybox_hardware::traits::KeySource;
/// use keybox_hardware::KeyInput;
///
/// #[tokio::main]
/// async fn main() -> keybox_hardware::Result<()> {
///     let (mut reader, handle) = MockKeyReader::new();
///
///     handle.swipe("42").await?;
///
///     assert_eq!(reader.next_key().await?, KeyInput::Digit(4));
///     assert_eq!(reader.next_key().await?, KeyInput::Digit(2));
///     assert_eq!(reader.next_key().await?, KeyInput::Enter);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockKeyReader {
    events_rx: mpsc::Receiver<ReaderEvent>,
    info: DeviceInfo,
}

impl MockKeyReader {
    /// Create a mock reader and its controlling handle.
    pub fn new() -> (Self, MockKeyReaderHandle) {
        Self::with_name("Mock Reader")
    }

    /// Create a mock reader with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockKeyReaderHandle) {
        let (events_tx, events_rx) = mpsc::channel(256);

        let reader = Self {
            events_rx,
            info: DeviceInfo::new(name, "mock://reader"),
        };

        (reader, MockKeyReaderHandle { events_tx })
    }
}

impl KeySource for MockKeyReader {
    async fn next_key(&mut self) -> Result<KeyInput> {
        match self.events_rx.recv().await {
            Some(ReaderEvent::Key(key)) => Ok(key),
            Some(ReaderEvent::Fail) => Err(HardwareError::disconnected(self.info.name.clone())),
            None => Err(HardwareError::disconnected("Reader input channel closed")),
        }
    }

    fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

/// Handle for driving a [`MockKeyReader`].
#[derive(Debug, Clone)]
pub struct MockKeyReaderHandle {
    events_tx: mpsc::Sender<ReaderEvent>,
}

impl MockKeyReaderHandle {
    async fn push(&self, event: ReaderEvent) -> Result<()> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("Reader input channel closed"))
    }

    /// Press a single key.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn press(&self, key: KeyInput) -> Result<()> {
        self.push(ReaderEvent::Key(key)).await
    }

    /// Type a string of digits without a terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if `digits` contains a non-digit character or the
    /// reader has been dropped.
    pub async fn type_digits(&self, digits: &str) -> Result<()> {
        for c in digits.chars() {
            let key = c.to_digit(10).ok_or_else(|| {
                HardwareError::invalid_data(format!("Not a digit: {c:?}"))
            })?;
            self.press(KeyInput::Digit(key as u8)).await?;
        }
        Ok(())
    }

    /// Type a complete scan: the digits followed by Enter.
    ///
    /// # Errors
    ///
    /// Same as [`type_digits`](Self::type_digits).
    pub async fn swipe(&self, digits: &str) -> Result<()> {
        self.type_digits(digits).await?;
        self.press(KeyInput::Enter).await
    }

    /// Make the reader's next read fail as if the device was unplugged.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn fail(&self) -> Result<()> {
        self.push(ReaderEvent::Fail).await
    }
}
