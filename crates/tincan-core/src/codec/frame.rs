//! Inbound framing.
//!
//! [`FrameReader`] turns an arbitrarily chunked byte stream into complete
//! protocol lines. Whatever follows the last CR LF of a chunk is kept and
//! prepended to the next one, so a line is emitted exactly once and only after
//! its terminator has been seen.

use bytes::BytesMut;

use crate::error::{ProtocolError, ProtocolResult};

const CRLF: &[u8] = b"\r\n";

/// Longest inbound line accepted, excluding the terminator.
///
/// Servers advertising message tags may send far more than the classic 512
/// bytes, so the limit follows the 8191-byte convention of modern servers.
pub const MAX_INBOUND_LINE_LEN: usize = 8191;

/// Splits a byte stream into CR LF terminated lines.
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: BytesMut,
    /// Bytes of `buffer` already known not to contain a terminator.
    scanned: usize,
}

impl FrameReader {
    /// Creates an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one read's worth of bytes and returns every line it completes.
    ///
    /// Terminators are stripped. Bytes are decoded as UTF-8, replacing invalid
    /// sequences.
    ///
    /// # Errors
    ///
    /// - An empty chunk means the peer closed the stream and yields
    ///   [`ProtocolError::ConnectionReset`].
    /// - A line longer than [`MAX_INBOUND_LINE_LEN`], or that many buffered
    ///   bytes without a terminator, yields [`ProtocolError::LineTooLong`]. The
    ///   buffer is discarded.
    pub fn feed(&mut self, bytes: &[u8]) -> ProtocolResult<Vec<String>> {
        if bytes.is_empty() {
            return Err(ProtocolError::ConnectionReset);
        }

        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.find_terminator() {
            if pos > MAX_INBOUND_LINE_LEN {
                return Err(self.overflow(pos));
            }
            let frame = self.buffer.split_to(pos + CRLF.len());
            lines.push(String::from_utf8_lossy(&frame[..pos]).into_owned());
            self.scanned = 0;
        }

        // Room for a full line plus a CR still waiting for its LF.
        if self.buffer.len() > MAX_INBOUND_LINE_LEN + 1 {
            return Err(self.overflow(self.buffer.len()));
        }
        // A trailing CR may be completed by the next chunk.
        self.scanned = self.buffer.len().saturating_sub(1);

        Ok(lines)
    }

    /// Returns the number of buffered bytes that do not yet form a line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn overflow(&mut self, len: usize) -> ProtocolError {
        self.buffer.clear();
        self.scanned = 0;
        ProtocolError::LineTooLong {
            len,
            limit: MAX_INBOUND_LINE_LEN,
        }
    }

    fn find_terminator(&self) -> Option<usize> {
        self.buffer[self.scanned..]
            .windows(CRLF.len())
            .position(|w| w == CRLF)
            .map(|offset| self.scanned + offset)
    }
}
