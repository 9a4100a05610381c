//! Incremental Line Splitter
//!
//! The digest listing is an unbounded byte stream with one digest per line.
//! Chunk boundaries are arbitrary, so a digest may arrive split across any
//! number of chunks. The splitter carries the partial tail between calls
//! and yields each line as soon as its delimiter is seen.
//!
//! The delimiter is a single `\n`. A `\r` before it stays part of the line.
//!
//! At most [`MAX_LINE`] bytes of a line are buffered. Anything past that is
//! dropped up to the next delimiter and the line is yielded truncated, so an
//! overlong line still surfaces exactly once and can never validate.

use bytes::{Buf, Bytes, BytesMut};

use super::digest::DIGEST_LENGTH;

/// Line delimiter of the digest listing.
pub const DELIMITER: u8 = b'\n';

/// Longest line prefix kept. One byte past a digest, so a kept `\r` still
/// fits and a truncated line is still too long to be a digest.
pub const MAX_LINE: usize = DIGEST_LENGTH + 1;

/// Stateful splitter for a `\n`-delimited byte stream.
#[derive(Debug, Default)]
pub struct DigestSplitter {
    partial: BytesMut,
}

impl DigestSplitter {
    /// Create an empty splitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completes, in order.
    ///
    /// Bytes after the last delimiter are held until a later chunk
    /// completes them or [`finish`](Self::finish) flushes them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == DELIMITER) {
            self.buffer(&rest[..pos]);
            lines.push(self.partial.split().freeze());
            rest = &rest[pos + 1..];
        }
        self.buffer(rest);

        lines
    }

    fn buffer(&mut self, bytes: &[u8]) {
        let room = MAX_LINE.saturating_sub(self.partial.len());
        let take = bytes.len().min(room);
        self.partial.extend_from_slice(&bytes[..take]);
    }

    /// Flush the unterminated tail at end of stream, if any.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.partial.has_remaining() {
            Some(self.partial.split().freeze())
        } else {
            None
        }
    }

    /// Number of buffered bytes not yet terminated by a delimiter.
    pub fn pending(&self) -> usize {
        self.partial.len()
    }
}
