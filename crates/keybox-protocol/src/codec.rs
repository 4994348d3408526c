//! Tokio codec for the control link line protocol.
//!
//! `ControlCodec` implements [`Decoder`] (bytes to [`InboundMessage`], one
//! per newline-terminated line) and [`Encoder<Command>`] (command to its wire
//! bytes). Wrapping a serial stream in `Framed<_, ControlCodec>` gives the
//! session a cancel-safe message stream: a partially received line stays in
//! the read buffer until its newline arrives.
//!
//! ```text
//! Serial Stream -> Decoder -> InboundMessage
//! Command -> Encoder -> Serial Stream
//! ```
//!
//! # Decoding Rules
//!
//! - Lines end at `\n`; a trailing `\r` and surrounding whitespace are trimmed.
//! - Bytes are decoded as ASCII; anything else is replaced with `U+FFFD`.
//! - Blank lines are skipped.
//! - A line longer than the maximum length is discarded up to and including
//!   its newline, without closing the stream.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

use crate::{Command, InboundMessage};
use keybox_core::{Error, Result};

/// Default maximum line length in bytes.
///
/// Every legitimate message is well under this size; the limit only bounds
/// buffer growth when a peer streams garbage without newlines.
const DEFAULT_MAX_LINE_LENGTH: usize = 256;

/// Codec for the microcontroller control link.
///
/// # Example
///
/// ```
/// use bytes::{Buf, BytesMut};
/// use tokio_util::codec::Decoder;
/// use keybox_protocol::{ControlCodec, InboundMessage};
///
/// let mut codec = ControlCodec::new();
/// let mut buffer = BytesMut::from(&b"UPDATE_MODE\r\nDELE"[..]);
///
/// assert_eq!(codec.decode(&mut buffer).unwrap(), Some(InboundMessage::UpdateMode));
/// assert_eq!(codec.decode(&mut buffer).unwrap(), None);
/// ```
#[derive(Debug)]
pub struct ControlCodec {
    /// Index in the read buffer already scanned for a newline.
    next_index: usize,

    /// Maximum accepted line length in bytes.
    max_line_length: usize,

    /// Dropping the rest of an over-long line until its newline.
    is_discarding: bool,
}

impl ControlCodec {
    /// Create a codec with the default maximum line length.
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom maximum line length.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            next_index: 0,
            max_line_length,
            is_discarding: false,
        }
    }
}

impl Default for ControlCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode raw line bytes as ASCII, replacing anything outside it.
fn decode_ascii(bytes: &[u8]) -> String {
    if bytes.is_ascii() {
        return bytes.iter().map(|&b| b as char).collect();
    }

    warn!(len = bytes.len(), "Non-ASCII bytes on control link replaced");
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' })
        .collect()
}

impl Decoder for ControlCodec {
    type Item = InboundMessage;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let newline = src[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            match (self.is_discarding, newline) {
                (true, Some(end)) => {
                    src.advance(end + 1);
                    self.next_index = 0;
                    self.is_discarding = false;
                    trace!("Finished discarding over-long control link line");
                }
                (true, None) => {
                    src.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(end)) => {
                    self.next_index = 0;

                    let line = src.split_to(end + 1);
                    if end > self.max_line_length {
                        warn!(len = end, "Discarding over-long control link line");
                        continue;
                    }

                    let text = decode_ascii(&line[..end]);
                    let text = text.trim();
                    if text.is_empty() {
                        trace!("Skipping blank control link line");
                        continue;
                    }

                    return Ok(Some(InboundMessage::parse(text)));
                }
                (false, None) if src.len() > self.max_line_length => {
                    warn!(
                        len = src.len(),
                        max = self.max_line_length,
                        "Discarding over-long control link line"
                    );
                    src.clear();
                    self.next_index = 0;
                    self.is_discarding = true;
                    return Ok(None);
                }
                (false, None) => {
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(message) = self.decode(buf)? {
            return Ok(Some(message));
        }

        self.next_index = 0;
        if self.is_discarding {
            self.is_discarding = false;
            buf.clear();
            return Ok(None);
        }
        if buf.is_empty() {
            return Ok(None);
        }

        // Unterminated trailing line at end of stream
        let rest = buf.split();
        let text = decode_ascii(&rest);
        let text = text.trim();
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(InboundMessage::parse(text)))
        }
    }
}

impl Encoder<Command> for ControlCodec {
    type Error = Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<()> {
        trace!(command = %item, "Encoding control link command");
        dst.extend_from_slice(&item.to_wire());
        Ok(())
    }
}
