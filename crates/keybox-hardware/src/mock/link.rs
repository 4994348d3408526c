//! Mock control link for testing and development.
//!
//! Inbound lines go through the same [`InboundMessage::parse`] the serial
//! codec uses, so tests see exactly what the real link would deliver.
//! Outbound commands are recorded for inspection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use keybox_protocol::{Command, InboundMessage};
use tokio::sync::mpsc;
use tracing::trace;

use crate::traits::ControlLink;
use crate::{DeviceInfo, HardwareError, Result};

#[derive(Debug)]
enum LinkEvent {
    Line(String),
    Fail,
}

#[derive(Debug, Default)]
struct LinkShared {
    sent: Mutex<Vec<Command>>,
    fail_writes: AtomicBool,
    closed: AtomicBool,
}

/// Mock microcontroller link.
#[derive(Debug)]
pub struct MockControlLink {
    inbound_rx: mpsc::Receiver<LinkEvent>,
    shared: Arc<LinkShared>,
    info: DeviceInfo,
}

impl MockControlLink {
    /// Create a mock link and its controlling handle.
    pub fn new() -> (Self, MockControlLinkHandle) {
        Self::with_name("Mock Control Link")
    }

    /// Create a mock link with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockControlLinkHandle) {
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let shared = Arc::new(LinkShared::default());

        let link = Self {
            inbound_rx,
            shared: Arc::clone(&shared),
            info: DeviceInfo::new(name, "mock://control-link"),
        };

        (link, MockControlLinkHandle { inbound_tx, shared })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(HardwareError::disconnected(self.info.name.clone()));
        }
        Ok(())
    }
}

impl ControlLink for MockControlLink {
    async fn send(&mut self, command: Command) -> Result<()> {
        self.ensure_open()?;

        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(HardwareError::communication(format!(
                "write {command}: simulated failure"
            )));
        }

        trace!(%command, "Mock link recorded command");
        self.shared
            .sent
            .lock()
            .map_err(|_| HardwareError::communication("sent log poisoned"))?
            .push(command);
        Ok(())
    }

    async fn recv(&mut self) -> Result<InboundMessage> {
        self.ensure_open()?;

        loop {
            match self.inbound_rx.recv().await {
                Some(LinkEvent::Line(line)) => {
                    // Blank lines never reach the session on a real link.
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Ok(InboundMessage::parse(&line));
                }
                Some(LinkEvent::Fail) => {
                    return Err(HardwareError::disconnected(self.info.name.clone()));
                }
                None => return Err(HardwareError::disconnected("Link channel closed")),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.shared.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

/// Handle for driving a [`MockControlLink`].
///
/// # Examples
///
/// ```
/// use keybox_hardware::mock::MockControlLink;
/// use keybox_hardware::traits::ControlLink;
/// use keybox_protocol::{Command, InboundMessage};
///
/// #[tokio::main]
/// async fn main() -> keybox_hardware::Result<()> {
///     let (mut link, handle) = MockControlLink::new();
///
///     handle.send_line("DELETE_MODE").await?;
///     assert_eq!(link.recv().await?, InboundMessage::DeleteMode);
///
///     link.send(Command::IdResetComplete).await?;
///     assert_eq!(handle.sent(), vec![Command::IdResetComplete]);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockControlLinkHandle {
    inbound_tx: mpsc::Sender<LinkEvent>,
    shared: Arc<LinkShared>,
}

impl MockControlLinkHandle {
    /// Deliver one inbound line, as the microcontroller would print it.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has been dropped.
    pub async fn send_line(&self, line: impl Into<String>) -> Result<()> {
        self.inbound_tx
            .send(LinkEvent::Line(line.into()))
            .await
            .map_err(|_| HardwareError::disconnected("Link channel closed"))
    }

    /// Make the link's next read fail as if the cable was pulled.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has been dropped.
    pub async fn disconnect(&self) -> Result<()> {
        self.inbound_tx
            .send(LinkEvent::Fail)
            .await
            .map_err(|_| HardwareError::disconnected("Link channel closed"))
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Commands written so far.
    pub fn sent(&self) -> Vec<Command> {
        self.shared
            .sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Take and clear the commands written so far.
    pub fn take_sent(&self) -> Vec<Command> {
        self.shared
            .sent
            .lock()
            .map(|mut sent| std::mem::take(&mut *sent))
            .unwrap_or_default()
    }

    /// Check whether the link has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}
