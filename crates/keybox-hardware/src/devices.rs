//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn KeySource>`
//! is unavailable. These enums give the session controller one concrete type
//! per device role while still allowing real and mock devices to be swapped.
//!
//! [`DiscoveredDevice`] is what a locator probe returns: either a serial-style
//! handle (usable as the control link) or an event-style handle (usable as
//! the reader). The caller decides which kind it needs.
//!
//! # Examples
//!
//! ```
//! use keybox_hardware::devices::AnyKeySource;
//! use keybox_hardware::mock::MockKeyReader;
//! use keybox_hardware::traits::KeySource;
//!
//! let (reader, _handle) = MockKeyReader::new();
//! let any_reader = AnyKeySource::Mock(reader);
//! assert_eq!(any_reader.info().name, "Mock Reader");
//! ```

use keybox_protocol::{Command, InboundMessage};

use crate::evdev_reader::EvdevReader;
use crate::mock::{MockControlLink, MockKeyReader};
use crate::serial_link::SerialControlLink;
use crate::traits::{ControlLink, KeySource};
use crate::{DeviceInfo, KeyInput, Result};

/// Enum wrapper for reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyKeySource {
    /// Linux input-event device (keyboard-wedge reader).
    Evdev(EvdevReader),

    /// Mock reader for development and testing.
    Mock(MockKeyReader),
}

impl KeySource for AnyKeySource {
    async fn next_key(&mut self) -> Result<KeyInput> {
        match self {
            Self::Evdev(device) => device.next_key().await,
            Self::Mock(device) => device.next_key().await,
        }
    }

    fn info(&self) -> &DeviceInfo {
        match self {
            Self::Evdev(device) => device.info(),
            Self::Mock(device) => device.info(),
        }
    }
}

/// Enum wrapper for control link dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyControlLink {
    /// USB serial link to the microcontroller.
    Serial(SerialControlLink),

    /// Mock link for development and testing.
    Mock(MockControlLink),
}

impl ControlLink for AnyControlLink {
    async fn send(&mut self, command: Command) -> Result<()> {
        match self {
            Self::Serial(link) => link.send(command).await,
            Self::Mock(link) => link.send(command).await,
        }
    }

    async fn recv(&mut self) -> Result<InboundMessage> {
        match self {
            Self::Serial(link) => link.recv().await,
            Self::Mock(link) => link.recv().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Serial(link) => link.close().await,
            Self::Mock(link) => link.close().await,
        }
    }

    fn info(&self) -> &DeviceInfo {
        match self {
            Self::Serial(link) => link.info(),
            Self::Mock(link) => link.info(),
        }
    }
}

/// Device handle produced by a discovery probe.
#[derive(Debug)]
pub enum DiscoveredDevice {
    /// Serial-style handle.
    Serial(AnyControlLink),

    /// Input-event-style handle.
    Event(AnyKeySource),
}

impl DiscoveredDevice {
    /// Get device information.
    pub fn info(&self) -> &DeviceInfo {
        match self {
            Self::Serial(link) => link.info(),
            Self::Event(reader) => reader.info(),
        }
    }

    /// Short name of the handle kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serial(_) => "serial",
            Self::Event(_) => "input-event",
        }
    }

    /// Take the handle as a control link, if it is serial-style.
    pub fn into_control_link(self) -> Option<AnyControlLink> {
        match self {
            Self::Serial(link) => Some(link),
            Self::Event(_) => None,
        }
    }

    /// Take the handle as a reader, if it is event-style.
    pub fn into_key_source(self) -> Option<AnyKeySource> {
        match self {
            Self::Event(reader) => Some(reader),
            Self::Serial(_) => None,
        }
    }
}
