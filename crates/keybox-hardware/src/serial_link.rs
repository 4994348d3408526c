//! USB serial control link driver.
//!
//! Wraps a `tokio-serial` stream in `Framed<_, ControlCodec>` so commands and
//! inbound lines are framed by the protocol crate.
//!
//! # Design Principles
//!
//! - **No automatic retry**: the session controller owns reconnection
//! - **Fire-and-forget writes**: `send` does not wait for a reply
//! - **Clean input on open**: stale bytes from before the open are discarded

use std::fmt;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use keybox_protocol::{Command, ControlCodec, InboundMessage};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use crate::traits::ControlLink;
use crate::{DeviceInfo, HardwareError, Result, SerialSettings};

/// Timeout for the final flush when closing the link.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

/// Serial control link to the lock microcontroller.
pub struct SerialControlLink {
    /// Framed serial stream (None once closed)
    framed: Option<Framed<SerialStream, ControlCodec>>,

    info: DeviceInfo,
}

impl SerialControlLink {
    /// Open the serial port at `path` with the given settings.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be opened or configured.
    pub fn open(path: &str, settings: &SerialSettings) -> Result<Self> {
        let port = tokio_serial::new(path, settings.baud_rate)
            .timeout(settings.read_timeout())
            .open_native_async()
            .map_err(|e| {
                HardwareError::initialization_failed(format!("failed to open {path}: {e}"))
            })?;

        if let Err(e) = port.clear(ClearBuffer::Input) {
            warn!(path, "Failed to reset serial input buffer: {}", e);
        }

        info!(path, baud = settings.baud_rate, "Serial link opened");

        Ok(Self {
            framed: Some(Framed::new(port, ControlCodec::new())),
            info: DeviceInfo::new("Serial Control Link", path),
        })
    }

    /// Attach discovery metadata.
    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = info;
        self
    }

    /// Check if the link is still open.
    pub fn is_open(&self) -> bool {
        self.framed.is_some()
    }

    fn framed(&mut self) -> Result<&mut Framed<SerialStream, ControlCodec>> {
        let name = &self.info.name;
        self.framed
            .as_mut()
            .ok_or_else(|| HardwareError::disconnected(name.clone()))
    }
}

impl fmt::Debug for SerialControlLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialControlLink")
            .field("info", &self.info)
            .field("open", &self.is_open())
            .finish()
    }
}

impl ControlLink for SerialControlLink {
    async fn send(&mut self, command: Command) -> Result<()> {
        trace!(%command, "Sending command");
        self.framed()?
            .send(command)
            .await
            .map_err(|e| HardwareError::communication(format!("write {command}: {e}")))
    }

    async fn recv(&mut self) -> Result<InboundMessage> {
        let name = self.info.name.clone();
        match self.framed()?.next().await {
            Some(Ok(message)) => {
                trace!(%message, "Received line");
                Ok(message)
            }
            Some(Err(e)) => Err(HardwareError::communication(format!("read: {e}"))),
            None => Err(HardwareError::disconnected(name)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut framed) = self.framed.take() {
            match tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, framed.flush()).await {
                Ok(Ok(())) => debug!("Flush completed"),
                Ok(Err(e)) => warn!("Error flushing during close: {}", e),
                Err(_) => warn!(
                    "Flush timeout during close ({}ms)",
                    CLOSE_FLUSH_TIMEOUT.as_millis()
                ),
            }
            debug!(path = %self.info.path, "Serial link closed");
        }
        Ok(())
    }

    fn info(&self) -> &DeviceInfo {
        &self.info
    }
}
