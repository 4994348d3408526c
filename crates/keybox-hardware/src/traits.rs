//! Hardware device trait definitions.
//!
//! These traits are the contract between the session controller and the two
//! peripherals it multiplexes: the keyboard-wedge RFID reader ([`KeySource`])
//! and the microcontroller control link ([`ControlLink`]). Device discovery
//! is abstracted by [`DeviceLocator`].
//!
//! All traits use native `async fn` methods (Edition 2024 RPITIT). They are
//! not object-safe; dispatch over concrete devices goes through the enums in
//! [`devices`](crate::devices).
//!
//! # Cancel Safety
//!
//! The session polls `next_key` and `recv` inside `tokio::select!`, dropping
//! whichever future loses. Implementations must keep partial input (a half
//! received line, buffered events) in `self`, never in the future.

#![allow(async_fn_in_trait)]

use keybox_core::BusIdentity;
use keybox_protocol::{Command, InboundMessage};

use crate::devices::DiscoveredDevice;
use crate::error::Result;
use crate::types::{DeviceInfo, KeyInput};

/// A keyboard-style event source such as a USB RFID reader.
///
/// # Examples
///
/// ```no_run
/// use keybox_hardware::traits::KeySource;
/// use keybox_hardware::{KeyInput, Result};
///
/// async fn read_tag<K: KeySource>(reader: &mut K) -> Result<String> {
///     let mut tag = String::new();
///
///     loop {
///         match reader.next_key().await? {
///             key if key.is_terminator() => break,
///             key => tag.extend(key.as_char()),
///         }
///     }
///
///     Ok(tag)
/// }
/// ```
pub trait KeySource {
    /// Wait for the next key-down event.
    ///
    /// Key releases and auto-repeat are filtered out by the implementation.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is disconnected or the read fails.
    async fn next_key(&mut self) -> Result<KeyInput>;

    /// Get device information.
    fn info(&self) -> &DeviceInfo;
}

/// Line-oriented command channel to the lock microcontroller.
///
/// # Examples
///
/// ```no_run
/// use keybox_hardware::traits::ControlLink;
/// use keybox_hardware::Result;
/// use keybox_protocol::{Command, InboundMessage};
///
/// async fn grant<L: ControlLink>(link: &mut L) -> Result<InboundMessage> {
///     link.send(Command::OpenLock).await?;
///     link.recv().await
/// }
/// ```
pub trait ControlLink {
    /// Write one command. Fire-and-forget: no acknowledgment is awaited.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or the write fails.
    async fn send(&mut self, command: Command) -> Result<()>;

    /// Wait for the next inbound line.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or the transport fails.
    async fn recv(&mut self) -> Result<InboundMessage>;

    /// Close the link. Closing an already closed link is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Get device information.
    fn info(&self) -> &DeviceInfo;
}

/// Single-attempt device discovery by bus identity.
///
/// A probe never retries; callers own the retry policy.
pub trait DeviceLocator {
    /// Probe once for a device with the given identity.
    ///
    /// Returns `Ok(None)` when nothing matching is attached.
    ///
    /// # Errors
    ///
    /// Returns an error if a matching device exists but cannot be opened.
    async fn probe(&mut self, identity: BusIdentity) -> Result<Option<DiscoveredDevice>>;
}
