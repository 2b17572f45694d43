//! Line-based codec for controller communication.
//!
//! Commands are terminated with a single `\n`. The firmware prints with
//! `Serial.println`, so responses arrive as `\r\n`-terminated lines; the `\r`
//! is stripped together with any other trailing whitespace.

use bytes::BytesMut;

/// Command line terminator.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Initial receive buffer capacity. The longest line the firmware prints is
/// well under this, but the buffer grows if a line is longer.
pub const MAX_LINE_LENGTH: usize = 64;

/// A codec for reading and writing controller lines.
///
/// Received bytes are accumulated until a complete `\n`-terminated line is
/// available, so a read that stops mid-line never yields partial data.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl LineCodec {
    /// Create a new line codec.
    pub fn new() -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(MAX_LINE_LENGTH * 2),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete line from the buffer.
    ///
    /// Returns the line with trailing whitespace removed, or `None` if no
    /// terminator has been received yet. Blank lines are returned as empty
    /// strings rather than skipped.
    pub fn decode_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&b| b == LINE_TERMINATOR)?;

        let line_data = self.buffer.split_to(end + 1);
        let line = String::from_utf8_lossy(&line_data[..end]);
        Some(line.trim_end().to_string())
    }

    /// Encode a command for transmission.
    ///
    /// Appends the `\n` terminator.
    pub fn encode_command(cmd: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(cmd.len() + 1);
        buf.extend_from_slice(cmd.as_bytes());
        buf.push(LINE_TERMINATOR);
        buf
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the current buffer contents as a string (for debugging).
    pub fn buffer_as_str(&self) -> String {
        String::from_utf8_lossy(&self.buffer).to_string()
    }
}
