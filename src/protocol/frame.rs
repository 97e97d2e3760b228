//! Length-Prefixed Message Framing
//!
//! Every message on the wire, in both directions, is:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ len: u16 BE  │ len bytes of UTF-8 text      │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! The parser works the same way as any incremental stream parser:
//! - `Ok(Some((message, consumed)))` - a full message was decoded
//! - `Ok(None)` - the buffer holds only part of a message, read more
//! - `Err(FrameError)` - the bytes can never form a valid message

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size of the length prefix in bytes.
pub const LEN_PREFIX: usize = 2;

/// Largest payload a single message can carry.
pub const MAX_MESSAGE_LEN: usize = u16::MAX as usize;

/// Errors that can occur while encoding or decoding a message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    /// The payload does not fit the 2-byte length prefix (or the configured limit)
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The payload is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Result type for framing operations.
pub type FrameResult<T> = Result<T, FrameError>;

/// Appends one framed message to `dst`.
pub fn encode_message(message: &str, dst: &mut BytesMut) -> FrameResult<()> {
    let payload = message.as_bytes();
    let len = u16::try_from(payload.len()).map_err(|_| FrameError::MessageTooLarge {
        size: payload.len(),
        max: MAX_MESSAGE_LEN,
    })?;

    dst.reserve(LEN_PREFIX + payload.len());
    dst.put_u16(len);
    dst.put_slice(payload);
    Ok(())
}

/// Frames a single message into a fresh buffer.
///
/// # Example
///
/// ```
/// use recstore::protocol::frame::encode_to_bytes;
///
/// let bytes = encode_to_bytes("INIT").unwrap();
/// assert_eq!(&bytes[..], b"\x00\x04INIT");
/// ```
pub fn encode_to_bytes(message: &str) -> FrameResult<Bytes> {
    let mut buf = BytesMut::with_capacity(LEN_PREFIX + message.len());
    encode_message(message, &mut buf)?;
    Ok(buf.freeze())
}

/// Incremental decoder for length-prefixed messages.
#[derive(Debug, Clone)]
pub struct FrameParser {
    /// Largest payload accepted from the peer
    max_len: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Creates a parser that accepts any payload the prefix can describe.
    pub fn new() -> Self {
        Self {
            max_len: MAX_MESSAGE_LEN,
        }
    }

    /// Creates a parser that rejects payloads longer than `max_len`.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            max_len: max_len.min(MAX_MESSAGE_LEN),
        }
    }

    /// Attempts to decode one message from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> FrameResult<Option<(String, usize)>> {
        if buf.len() < LEN_PREFIX {
            return Ok(None);
        }

        let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        if len > self.max_len {
            return Err(FrameError::MessageTooLarge {
                size: len,
                max: self.max_len,
            });
        }

        let end = LEN_PREFIX + len;
        if buf.len() < end {
            return Ok(None);
        }

        let text = std::str::from_utf8(&buf[LEN_PREFIX..end])
            .map_err(|e| FrameError::InvalidUtf8(e.to_string()))?;

        Ok(Some((text.to_string(), end)))
    }
}

/// Convenience function to decode one message with the default limit.
pub fn parse_message(buf: &[u8]) -> FrameResult<Option<(String, usize)>> {
    FrameParser::new().parse(buf)
}
