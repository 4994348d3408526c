//! Wire protocol of the microcontroller control link.
//!
//! The link is a line-oriented ASCII channel. The controller sends
//! [`Command`]s (handshakes without a newline, everything else
//! newline-terminated) and receives [`InboundMessage`]s, one per line.
//! [`ControlCodec`] frames both directions for `tokio_util::codec::Framed`.

pub mod codec;
pub mod message;

pub use codec::ControlCodec;
pub use message::{Command, InboundMessage};
