//! Line buffering for the serial command stream
//!
//! Bytes are accumulated until a `\n` terminator. `\r` is dropped wherever
//! it appears, so both LF and CRLF hosts work. A completed line must be
//! valid UTF-8.
//!
//! Overlong lines are rejected as a whole: once a line exceeds
//! [`MAX_LINE_LEN`] the buffer is cleared, every byte up to the next `\n` is
//! discarded, and the terminator reports [`LineError::TooLong`]. No partial
//! command is ever carried over into the following line.

use heapless::{String, Vec};

/// Maximum line length in bytes, excluding the terminator
pub const MAX_LINE_LEN: usize = 256;

/// Line terminator
pub const LINE_END: u8 = b'\n';

/// Ignored carriage return
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Errors reported when a line completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line exceeded [`MAX_LINE_LEN`] and was discarded
    TooLong,
    /// Completed line is not valid UTF-8
    Encoding,
}

/// A complete input line without its terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    text: String<MAX_LINE_LEN>,
}

impl Line {
    /// Raw line bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Line as text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Check if the line holds nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Accumulates stream bytes into lines
#[derive(Debug, Clone)]
pub struct LineBuffer {
    buffer: Vec<u8, MAX_LINE_LEN>,
    /// Current line overflowed; discard until the next terminator
    overflowed: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    /// Create an empty line buffer
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    /// Drop any partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }

    /// Number of bytes buffered for the current line
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if no partial line is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Check if the current line is being discarded
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Feed a single byte
    ///
    /// Returns `Ok(Some(line))` when a terminator completes a line,
    /// `Ok(None)` when more bytes are needed, or `Err` when the completed
    /// line was rejected for length or encoding. Empty lines are returned
    /// like any other line.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Line>, LineError> {
        match byte {
            CARRIAGE_RETURN => Ok(None),
            LINE_END => {
                if self.overflowed {
                    self.reset();
                    return Err(LineError::TooLong);
                }
                let bytes = core::mem::take(&mut self.buffer);
                let text = String::from_utf8(bytes).map_err(|_| LineError::Encoding)?;
                Ok(Some(Line { text }))
            }
            _ => {
                if !self.overflowed && self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.overflowed = true;
                }
                Ok(None)
            }
        }
    }
}
