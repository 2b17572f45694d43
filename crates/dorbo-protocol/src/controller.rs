//! Protocol engine: connection lifecycle, handshake and command execution.
//!
//! A [`Controller`] is a scoped resource. [`ControllerBuilder::connect`] (or
//! [`Controller::open`] for a real serial port) runs the handshake and only
//! returns a controller in the [`ConnectionState::Ready`] state. The transport
//! is closed by [`Controller::close`] or when the controller is dropped, and
//! also when the handshake fails.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Span};

use crate::commands::{Command, TERMINATOR_ERR, TERMINATOR_OK};
use crate::config::{ControllerConfig, HandshakeConfig, DEFAULT_READ_TIMEOUT_SECS};
use crate::error::{ControllerError, ControllerResult};
use crate::responses::CommandResult;
use crate::transport::{SerialTransport, Transport};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No device held.
    Closed,
    /// Device open, handshake in progress.
    Handshaking,
    /// Handshake complete; commands may be executed.
    Ready,
}

/// Builder that opens a [`Controller`] over an existing transport.
pub struct ControllerBuilder<T: Transport> {
    transport: T,
    read_timeout: Duration,
    handshake: HandshakeConfig,
    span: Option<Span>,
}

impl<T: Transport> ControllerBuilder<T> {
    /// Start building a controller over `transport` with default timeouts.
    pub fn new(transport: T) -> Self {
        ControllerBuilder {
            transport,
            read_timeout: Duration::from_secs_f64(DEFAULT_READ_TIMEOUT_SECS),
            handshake: HandshakeConfig::default(),
            span: None,
        }
    }

    /// Set the per-read timeout used for commands.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the handshake probing parameters.
    pub fn handshake(mut self, handshake: HandshakeConfig) -> Self {
        self.handshake = handshake;
        self
    }

    /// Set the span all controller events are recorded under.
    ///
    /// Defaults to an `info`-level `controller` span carrying the transport name.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Run the handshake and return a ready controller.
    ///
    /// On failure the transport is closed before the error is returned.
    pub fn connect(self) -> ControllerResult<Controller<T>> {
        let span = self
            .span
            .unwrap_or_else(|| info_span!("controller", port = %self.transport.name()));

        let mut controller = Controller {
            transport: self.transport,
            state: ConnectionState::Closed,
            read_timeout: self.read_timeout,
            span,
        };
        controller.start(&self.handshake)?;
        Ok(controller)
    }
}

/// An open connection to the access controller.
pub struct Controller<T: Transport> {
    transport: T,
    state: ConnectionState,
    read_timeout: Duration,
    span: Span,
}

impl Controller<SerialTransport> {
    /// Open the serial port described by `config` and run the handshake.
    pub fn open(config: &ControllerConfig) -> ControllerResult<Self> {
        config.validate()?;
        let read_timeout = config.read_timeout()?;

        let span = info_span!("controller", port = %config.port);
        let transport = {
            let _entered = span.enter();
            SerialTransport::open(&config.port, config.baud_rate, read_timeout)?
        };

        ControllerBuilder::new(transport)
            .read_timeout(read_timeout)
            .handshake(config.handshake)
            .span(span)
            .connect()
    }
}

impl<T: Transport> Controller<T> {
    /// Get the connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the per-read timeout used for commands.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Get the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute one command line and collect its response.
    ///
    /// Pending input is discarded first, then the command is written and lines
    /// are read until the `ok` or `err` terminator. A timeout before the
    /// terminator fails the whole command; no partial result is returned.
    pub fn execute(&mut self, command: &str) -> ControllerResult<CommandResult> {
        if self.state == ConnectionState::Closed {
            return Err(ControllerError::NotConnected);
        }
        let _entered = self.span.clone().entered();

        // Consume the prompt or any left-overs from earlier commands.
        self.transport.drain_pending()?;
        self.transport.write_line(command)?;

        let mut lines = Vec::new();
        loop {
            let Some(line) = self.transport.read_line(self.read_timeout)? else {
                debug!("timeout waiting for terminator ({:?})", command);
                return Err(ControllerError::ReadTimeout {
                    command: command.to_string(),
                });
            };

            match line.trim() {
                TERMINATOR_OK => return Ok(CommandResult { success: true, lines }),
                TERMINATOR_ERR => return Ok(CommandResult { success: false, lines }),
                data => lines.push(data.to_string()),
            }
        }
    }

    /// Execute a typed [`Command`].
    pub fn run(&mut self, command: &Command) -> ControllerResult<CommandResult> {
        self.execute(&command.to_command_string())
    }

    /// Release the transport. Safe to call more than once; commands issued
    /// afterwards fail with [`ControllerError::NotConnected`].
    pub fn close(&mut self) {
        let _entered = self.span.clone().entered();
        if self.state != ConnectionState::Closed {
            info!("closing controller");
        }
        self.transport.close();
        self.state = ConnectionState::Closed;
    }

    fn start(&mut self, handshake: &HandshakeConfig) -> ControllerResult<()> {
        let _entered = self.span.clone().entered();
        self.state = ConnectionState::Handshaking;

        let result = handshake
            .probe_timeout()
            .and_then(|probe_timeout| Ok((probe_timeout, handshake.attempts()?)))
            .and_then(|(probe_timeout, attempts)| self.shake_hands(probe_timeout, attempts));

        match result {
            Ok(()) => {
                self.state = ConnectionState::Ready;
                info!("controller ready");
                Ok(())
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    /// Probe with empty commands until one is answered `ok`.
    ///
    /// A stray `err` (the tail of a command typed before we connected) or a
    /// timeout uses up the round. The read timeout is shortened for the
    /// duration of the handshake and restored on every exit path.
    fn shake_hands(&mut self, probe_timeout: Duration, attempts: u32) -> ControllerResult<()> {
        let mut probing = TimeoutOverride::new(self, probe_timeout);
        let probe = Command::Probe.to_command_string();

        for attempt in 1..=attempts {
            debug!(attempt, "handshake attempt");
            match probing.execute(&probe) {
                Ok(result) if result.success => {
                    debug!(attempt, "handshake success");
                    return Ok(());
                }
                Ok(result) => debug!(lines = ?result.lines, "handshake got err"),
                Err(ControllerError::ReadTimeout { .. }) => debug!("handshake timeout"),
                Err(e) => return Err(e),
            }
        }

        warn!(attempts, "no response to handshake");
        Err(ControllerError::HandshakeFailure { attempts })
    }
}

impl<T: Transport> Drop for Controller<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Temporarily replaces a controller's read timeout, restoring it on drop.
struct TimeoutOverride<'a, T: Transport> {
    controller: &'a mut Controller<T>,
    saved: Duration,
}

impl<'a, T: Transport> TimeoutOverride<'a, T> {
    fn new(controller: &'a mut Controller<T>, timeout: Duration) -> Self {
        let saved = std::mem::replace(&mut controller.read_timeout, timeout);
        TimeoutOverride { controller, saved }
    }
}

impl<T: Transport> Deref for TimeoutOverride<'_, T> {
    type Target = Controller<T>;

    fn deref(&self) -> &Controller<T> {
        self.controller
    }
}

impl<T: Transport> DerefMut for TimeoutOverride<'_, T> {
    fn deref_mut(&mut self) -> &mut Controller<T> {
        self.controller
    }
}

impl<T: Transport> Drop for TimeoutOverride<'_, T> {
    fn drop(&mut self) {
        self.controller.read_timeout = self.saved;
    }
}
