//! Control link messages.
//!
//! | Direction | Message | Meaning |
//! |---|---|---|
//! | out | `PI_READY` (no newline) | handshake after the link opens |
//! | out | `RFID_READY` (no newline) | handshake after the reader is found |
//! | out | `OPEN_LOCK` | grant access, actuate the lock |
//! | out | `NO_ACCESS` | deny access |
//! | out | `EXIT_UPDATE` | leave enrollment mode |
//! | out | `UPDATE_READY` | acknowledge enrollment mode |
//! | out | `ID_RESET_COMPLETE` | acknowledge the wipe |
//! | in | `UPDATE_MODE` | request enrollment mode |
//! | in | `DELETE_MODE` | request a full wipe |
//! | in | anything else | logged and ignored |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Command sent from the controller to the microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Handshake after the link is opened.
    PiReady,

    /// Handshake after the reader is discovered.
    RfidReady,

    /// Access granted, actuate the lock.
    OpenLock,

    /// Access denied.
    NoAccess,

    /// Enrollment finished, back to normal mode.
    ExitUpdate,

    /// Enrollment mode entered, waiting for a scan.
    UpdateReady,

    /// Authorized list and log wiped.
    IdResetComplete,
}

impl Command {
    /// Command keyword as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::PiReady => "PI_READY",
            Command::RfidReady => "RFID_READY",
            Command::OpenLock => "OPEN_LOCK",
            Command::NoAccess => "NO_ACCESS",
            Command::ExitUpdate => "EXIT_UPDATE",
            Command::UpdateReady => "UPDATE_READY",
            Command::IdResetComplete => "ID_RESET_COMPLETE",
        }
    }

    /// Handshakes are written without a line terminator.
    pub fn is_handshake(&self) -> bool {
        matches!(self, Command::PiReady | Command::RfidReady)
    }

    /// Exact bytes written to the link for this command.
    ///
    /// # Examples
    ///
    /// ```
    /// use keybox_protocol::Command;
    ///
    /// assert_eq!(Command::PiReady.to_wire(), b"PI_READY".to_vec());
    /// assert_eq!(Command::OpenLock.to_wire(), b"OPEN_LOCK\n".to_vec());
    /// ```
    pub fn to_wire(&self) -> Vec<u8> {
        let mut bytes = self.as_str().as_bytes().to_vec();
        if !self.is_handshake() {
            bytes.push(b'\n');
        }
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message received from the microcontroller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InboundMessage {
    /// Request to enter enrollment mode.
    UpdateMode,

    /// Request to wipe authorized tags and logs.
    DeleteMode,

    /// Any other line, such as a status reply to `OPEN_LOCK`.
    Other(String),
}

impl InboundMessage {
    /// Classify one already decoded line.
    ///
    /// # Examples
    ///
    /// ```
    /// use keybox_protocol::InboundMessage;
    ///
    /// assert_eq!(InboundMessage::parse(" UPDATE_MODE\r"), InboundMessage::UpdateMode);
    /// assert_eq!(
    ///     InboundMessage::parse("LOCK_OPENED"),
    ///     InboundMessage::Other("LOCK_OPENED".to_string())
    /// );
    /// ```
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "UPDATE_MODE" => InboundMessage::UpdateMode,
            "DELETE_MODE" => InboundMessage::DeleteMode,
            other => InboundMessage::Other(other.to_string()),
        }
    }

    /// The line text of this message.
    pub fn as_str(&self) -> &str {
        match self {
            InboundMessage::UpdateMode => "UPDATE_MODE",
            InboundMessage::DeleteMode => "DELETE_MODE",
            InboundMessage::Other(text) => text,
        }
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
