//! Line-oriented I/O over the serial connection.
//!
//! The [`Transport`] trait is the seam between the protocol engine and the
//! physical link. [`SerialTransport`] implements it over a real serial port;
//! the [`mock`](crate::mock) module provides in-memory implementations for tests.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::SerialPort;
use tracing::{debug, trace};

use crate::codec::LineCodec;
use crate::error::{ControllerError, ControllerResult};

/// Size of each read from the serial port.
const READ_CHUNK: usize = 64;

/// Upper bound on a single `read_line` wait.
const MAX_READ_WAIT: Duration = Duration::from_secs(86_400);

/// Raw line I/O used by the protocol engine.
pub trait Transport {
    /// Human-readable name of the link, used in errors and logs.
    fn name(&self) -> &str;

    /// Discard everything already received but not yet read (a prompt or the
    /// tail of an earlier response). Never waits for more data to arrive.
    fn drain_pending(&mut self) -> ControllerResult<()>;

    /// Write `text` followed by `\n` and flush.
    fn write_line(&mut self, text: &str) -> ControllerResult<()>;

    /// Wait up to `timeout` for a complete line.
    ///
    /// Returns the line without its terminator and trailing whitespace, or
    /// `None` if the timeout elapsed first. Partial lines are never returned.
    fn read_line(&mut self, timeout: Duration) -> ControllerResult<Option<String>>;

    /// Release the underlying device. Calling this more than once is harmless.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn drain_pending(&mut self) -> ControllerResult<()> {
        (**self).drain_pending()
    }

    fn write_line(&mut self, text: &str) -> ControllerResult<()> {
        (**self).write_line(text)
    }

    fn read_line(&mut self, timeout: Duration) -> ControllerResult<Option<String>> {
        (**self).read_line(timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn drain_pending(&mut self) -> ControllerResult<()> {
        (**self).drain_pending()
    }

    fn write_line(&mut self, text: &str) -> ControllerResult<()> {
        (**self).write_line(text)
    }

    fn read_line(&mut self, timeout: Duration) -> ControllerResult<Option<String>> {
        (**self).read_line(timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// A [`Transport`] over a serial port.
pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn SerialPort>>,
    codec: LineCodec,
}

impl SerialTransport {
    /// Open a serial device.
    ///
    /// `read_timeout` is the initial port timeout; each [`Transport::read_line`]
    /// call sets its own.
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> ControllerResult<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| ControllerError::connection(path, e))?;

        debug!("opened {} at {} baud", path, baud_rate);
        Ok(SerialTransport {
            name: path.to_string(),
            port: Some(port),
            codec: LineCodec::new(),
        })
    }

    /// Check whether the port is still held.
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port_mut(&mut self) -> ControllerResult<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(ControllerError::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn drain_pending(&mut self) -> ControllerResult<()> {
        if self.codec.buffered_len() > 0 {
            debug!("discarding junk: {}", self.codec.buffer_as_str().trim());
            self.codec.clear();
        }

        let name = self.name.clone();
        let port = self.port_mut()?;
        loop {
            let pending = port
                .bytes_to_read()
                .map_err(|e| ControllerError::connection(&name, e))?;
            if pending == 0 {
                return Ok(());
            }

            let mut junk = vec![0u8; pending as usize];
            let n = match port.read(&mut junk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ControllerError::connection(&name, e)),
            };
            debug!("discarding junk: {}", String::from_utf8_lossy(&junk[..n]).trim());
        }
    }

    fn write_line(&mut self, text: &str) -> ControllerResult<()> {
        let name = self.name.clone();
        let frame = LineCodec::encode_command(text);
        let port = self.port_mut()?;

        port.write_all(&frame)
            .map_err(|e| ControllerError::connection(&name, e))?;
        port.flush()
            .map_err(|e| ControllerError::connection(&name, e))?;
        debug!("write line: {}", text);
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> ControllerResult<Option<String>> {
        let deadline = read_deadline(Instant::now(), timeout);
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(line) = self.codec.decode_line() {
                debug!("read line: {}", line);
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let name = self.name.clone();
            let port = self.port_mut()?;
            port.set_timeout(deadline - now)
                .map_err(|e| ControllerError::connection(&name, e))?;

            match port.read(&mut chunk) {
                Ok(n) => {
                    trace!("received {} bytes", n);
                    self.codec.push(&chunk[..n]);
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    if self.codec.buffered_len() > 0 {
                        trace!("partial line at timeout: {:?}", self.codec.buffer_as_str());
                    }
                    return Ok(None);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ControllerError::connection(&name, e)),
            }
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("closed {}", self.name);
        }
        self.codec.clear();
    }
}

/// Deadline for a read starting at `start`, with the wait capped at
/// [`MAX_READ_WAIT`].
fn read_deadline(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout.min(MAX_READ_WAIT))
        .unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_deadline() {
        let start = Instant::now();
        assert_eq!(read_deadline(start, Duration::from_secs(5)), start + Duration::from_secs(5));
        assert_eq!(read_deadline(start, Duration::ZERO), start);
    }

    #[test]
    fn test_read_deadline_caps_huge_timeouts() {
        let start = Instant::now();
        assert_eq!(read_deadline(start, Duration::MAX), start + MAX_READ_WAIT);
        assert_eq!(
            read_deadline(start, Duration::from_secs_f64(1.0e19)),
            start + MAX_READ_WAIT
        );
    }
}
