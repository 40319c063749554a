//! Newline framing for subprocess stdout.

use thiserror::Error;

/// Errors raised while framing a byte stream into lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FramingError {
    /// An unterminated line grew beyond the configured limit.
    #[error("unterminated line of {buffered} bytes exceeds the {limit} byte limit")]
    LineTooLong {
        /// Bytes currently buffered without a newline.
        buffered: usize,
        /// Configured limit.
        limit: usize,
    },
}

/// Growable byte buffer that yields complete newline-terminated lines.
///
/// Chunks may split lines and multi-byte characters anywhere; only complete
/// lines are decoded.
#[derive(Debug)]
pub struct LineBuffer {
    bytes: Vec<u8>,
    max_line_bytes: usize,
}

impl LineBuffer {
    /// Creates an empty buffer with a maximum unterminated line size.
    #[must_use]
    pub const fn new(max_line_bytes: usize) -> Self {
        Self {
            bytes: Vec::new(),
            max_line_bytes,
        }
    }

    /// Appends a chunk read from the stream.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::LineTooLong`] when the bytes after the last
    /// newline exceed the limit.
    pub fn extend(&mut self, chunk: &[u8]) -> Result<(), FramingError> {
        self.bytes.extend_from_slice(chunk);

        let last_newline = self.bytes.iter().rposition(|byte| *byte == b'\n');
        let unterminated = last_newline.map_or(self.bytes.len(), |position| {
            self.bytes.len().saturating_sub(position.saturating_add(1))
        });
        if unterminated > self.max_line_bytes {
            return Err(FramingError::LineTooLong {
                buffered: unterminated,
                limit: self.max_line_bytes,
            });
        }
        Ok(())
    }

    /// Removes and returns the next complete line without its terminator.
    ///
    /// A trailing `\r` is stripped. Invalid UTF-8 is replaced lossily so the
    /// line still reaches the JSON decoder and is reported there.
    pub fn next_line(&mut self) -> Option<String> {
        let position = self.bytes.iter().position(|byte| *byte == b'\n')?;
        let mut line: Vec<u8> = self.bytes.drain(..=position).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Returns the number of buffered bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
