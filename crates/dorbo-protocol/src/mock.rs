//! In-memory transports for exercising the protocol without hardware.
//!
//! - [`ScriptedTransport`] replays canned responses and records what was sent.
//! - [`SimulatedDevice`] interprets commands the way the controller firmware does.

use std::collections::VecDeque;
use std::time::Duration;

use crate::commands::{TERMINATOR_ERR, TERMINATOR_OK, WIEGAND26};
use crate::error::{ControllerError, ControllerResult};
use crate::responses::Credential;
use crate::transport::Transport;

/// One event returned by a scripted read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A complete line.
    Line(String),
    /// The read times out.
    Timeout,
}

impl Reply {
    /// Create a [`Reply::Line`].
    pub fn line(text: impl Into<String>) -> Self {
        Reply::Line(text.into())
    }
}

/// A transport that answers each written line with the next scripted batch
/// of replies.
///
/// Replies queued with [`respond`](Self::respond) become readable only after
/// the next [`Transport::write_line`]. A read with nothing queued times out.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: VecDeque<Vec<Reply>>,
    pending: VecDeque<Reply>,
    written: Vec<String>,
    read_timeouts: Vec<Duration>,
    drained: Vec<String>,
    drain_count: usize,
    closed: bool,
}

impl ScriptedTransport {
    /// Create a transport with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the replies released by the next unanswered write.
    pub fn respond(mut self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.responses.push_back(replies.into_iter().collect());
        self
    }

    /// Queue a batch of line replies.
    pub fn respond_lines(self, lines: &[&str]) -> Self {
        self.respond(lines.iter().map(|line| Reply::line(*line)))
    }

    /// Queue a batch that times out immediately.
    pub fn respond_timeout(self) -> Self {
        self.respond([Reply::Timeout])
    }

    /// Make a line readable before anything has been written.
    pub fn with_pending_line(mut self, line: &str) -> Self {
        self.pending.push_back(Reply::line(line));
        self
    }

    /// Lines written so far, without terminators.
    pub fn written(&self) -> &[String] {
        &self.written
    }

    /// Timeout passed to each `read_line` call, in order.
    pub fn read_timeouts(&self) -> &[Duration] {
        &self.read_timeouts
    }

    /// Lines thrown away by `drain_pending`.
    pub fn drained(&self) -> &[String] {
        &self.drained
    }

    /// Number of `drain_pending` calls.
    pub fn drain_count(&self) -> usize {
        self.drain_count
    }

    /// Check whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> ControllerResult<()> {
        if self.closed {
            return Err(ControllerError::NotConnected);
        }
        Ok(())
    }
}

impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    fn drain_pending(&mut self) -> ControllerResult<()> {
        self.ensure_open()?;
        self.drain_count += 1;
        for reply in self.pending.drain(..) {
            if let Reply::Line(line) = reply {
                self.drained.push(line.trim().to_string());
            }
        }
        Ok(())
    }

    fn write_line(&mut self, text: &str) -> ControllerResult<()> {
        self.ensure_open()?;
        self.written.push(text.to_string());
        if let Some(batch) = self.responses.pop_front() {
            self.pending.extend(batch);
        }
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> ControllerResult<Option<String>> {
        self.ensure_open()?;
        self.read_timeouts.push(timeout);
        match self.pending.pop_front() {
            Some(Reply::Line(line)) => Ok(Some(line.trim_end().to_string())),
            Some(Reply::Timeout) | None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Number of credential slots in the stock firmware build.
pub const SIMULATED_CAPACITY: usize = 100;

/// Number of doors in the stock firmware build.
pub const SIMULATED_DOORS: u8 = 2;

/// Longest command the firmware buffers.
pub const MAX_COMMAND_LENGTH: usize = 40;

/// An in-memory controller that executes commands like the firmware CLI.
///
/// Every command is answered with the firmware's diagnostic lines followed by
/// `ok` or `err`. Output not read before the next command stays queued, just
/// as unread bytes stay in a serial receive buffer.
///
/// Numeric arguments are narrowed like the firmware's `strtol` helpers: any
/// decimal number is accepted and truncated to the field width, so
/// `w w26 1 300 1` stores facility 44. Only non-numeric text is rejected.
#[derive(Debug)]
pub struct SimulatedDevice {
    credentials: Vec<Credential>,
    opened_doors: Vec<u8>,
    output: VecDeque<String>,
    commands: Vec<String>,
    closed: bool,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::with_capacity(SIMULATED_CAPACITY)
    }
}

impl SimulatedDevice {
    /// Create a device with the stock number of cleared slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device with `capacity` cleared slots.
    pub fn with_capacity(capacity: usize) -> Self {
        SimulatedDevice {
            credentials: vec![Credential::EMPTY; capacity],
            opened_doors: Vec::new(),
            output: VecDeque::new(),
            commands: Vec::new(),
            closed: false,
        }
    }

    /// Queue output as if the device printed it before the host connected.
    pub fn with_stale_output(mut self, line: &str) -> Self {
        self.output.push_back(line.to_string());
        self
    }

    /// Stored credentials, by index.
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// Overwrite a slot directly.
    pub fn store(&mut self, index: usize, credential: Credential) {
        if let Some(slot) = self.credentials.get_mut(index) {
            *slot = credential;
        }
    }

    /// Doors opened so far, in order.
    pub fn opened_doors(&self) -> &[u8] {
        &self.opened_doors
    }

    /// Every command line received.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Check whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn process(&mut self, command: &str) -> Result<Vec<String>, Vec<String>> {
        if command.len() > MAX_COMMAND_LENGTH {
            return Err(vec!["command too long".to_string()]);
        }

        let mut args = command.split(' ').filter(|arg| !arg.is_empty());
        let Some(name) = args.next() else {
            return Ok(Vec::new());
        };

        match name {
            "r" => {
                expect_type(args.next())?;
                let index = parse_u8(args.next(), "index")?;
                self.read(index as usize).map(|line| vec![line])
            }
            "w" => {
                expect_type(args.next())?;
                let index = parse_u8(args.next(), "index")?;
                let facility = parse_u8(args.next(), "facility")?;
                let user = parse_u16(args.next(), "user")?;
                let slot = self
                    .credentials
                    .get_mut(index as usize)
                    .ok_or_else(|| vec!["index too large".to_string()])?;
                *slot = Credential { facility, user };
                Ok(Vec::new())
            }
            "l" => {
                expect_type(args.next())?;
                (0..self.credentials.len())
                    .map(|index| self.read(index))
                    .collect()
            }
            "x" => {
                expect_type(args.next())?;
                self.credentials.fill(Credential::EMPTY);
                Ok(Vec::new())
            }
            "i" => Ok(vec![format!("{} {}", WIEGAND26, self.credentials.len())]),
            "o" => {
                let door: u8 = args
                    .next()
                    .ok_or_else(|| vec!["missing door".to_string()])?
                    .parse()
                    .map_err(|_| vec!["invalid door".to_string()])?;
                if door >= SIMULATED_DOORS {
                    return Err(vec!["invalid door".to_string()]);
                }
                self.opened_doors.push(door);
                Ok(Vec::new())
            }
            _ => Err(vec!["invalid command".to_string()]),
        }
    }

    fn read(&self, index: usize) -> Result<String, Vec<String>> {
        let credential = self
            .credentials
            .get(index)
            .ok_or_else(|| vec!["index too large".to_string()])?;
        Ok(format!("{} {} {}", index, credential.facility, credential.user))
    }
}

fn expect_type(arg: Option<&str>) -> Result<(), Vec<String>> {
    match arg {
        None => Err(vec!["missing type".to_string()]),
        Some(WIEGAND26) => Ok(()),
        Some(_) => Err(vec!["invalid type".to_string()]),
    }
}

fn parse_u8(arg: Option<&str>, name: &str) -> Result<u8, Vec<String>> {
    parse_long(arg, name).map(|value| value as u8)
}

fn parse_u16(arg: Option<&str>, name: &str) -> Result<u16, Vec<String>> {
    parse_long(arg, name).map(|value| value as u16)
}

/// Parse a signed decimal token into the firmware's 32-bit `long`,
/// saturating on overflow.
fn parse_long(arg: Option<&str>, name: &str) -> Result<i32, Vec<String>> {
    let text = arg.ok_or_else(|| vec![format!("missing {}", name)])?;
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(vec![format!("invalid {}", name)]);
    }
    Ok(text
        .parse()
        .unwrap_or(if text.starts_with('-') { i32::MIN } else { i32::MAX }))
}

impl Transport for SimulatedDevice {
    fn name(&self) -> &str {
        "simulated"
    }

    fn drain_pending(&mut self) -> ControllerResult<()> {
        if self.closed {
            return Err(ControllerError::NotConnected);
        }
        self.output.clear();
        Ok(())
    }

    fn write_line(&mut self, text: &str) -> ControllerResult<()> {
        if self.closed {
            return Err(ControllerError::NotConnected);
        }
        self.commands.push(text.to_string());

        let (lines, terminator) = match self.process(text) {
            Ok(lines) => (lines, TERMINATOR_OK),
            Err(lines) => (lines, TERMINATOR_ERR),
        };
        self.output.extend(lines);
        self.output.push_back(terminator.to_string());
        Ok(())
    }

    fn read_line(&mut self, _timeout: Duration) -> ControllerResult<Option<String>> {
        if self.closed {
            return Err(ControllerError::NotConnected);
        }
        Ok(self.output.pop_front())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(device: &mut SimulatedDevice, command: &str) -> Vec<String> {
        device.write_line(command).unwrap();
        let mut lines = Vec::new();
        while let Some(line) = device.read_line(Duration::ZERO).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_scripted_replies_follow_writes() {
        let mut transport = ScriptedTransport::new().respond_lines(&["a", "ok"]);

        assert_eq!(transport.read_line(Duration::ZERO).unwrap(), None);
        transport.write_line("x").unwrap();
        assert_eq!(transport.read_line(Duration::ZERO).unwrap(), Some("a".to_string()));
        assert_eq!(transport.read_line(Duration::ZERO).unwrap(), Some("ok".to_string()));
        assert_eq!(transport.read_line(Duration::ZERO).unwrap(), None);
    }

    #[test]
    fn test_scripted_closed_rejects_io() {
        let mut transport = ScriptedTransport::new();
        transport.close();
        assert!(matches!(transport.write_line("l w26"), Err(ControllerError::NotConnected)));
    }

    #[test]
    fn test_device_empty_command() {
        let mut device = SimulatedDevice::new();
        assert_eq!(exchange(&mut device, ""), vec!["ok"]);
    }

    #[test]
    fn test_device_write_then_read() {
        let mut device = SimulatedDevice::new();
        assert_eq!(exchange(&mut device, "w w26 3 103 26441"), vec!["ok"]);
        assert_eq!(exchange(&mut device, "r w26 3"), vec!["3 103 26441", "ok"]);
    }

    #[test]
    fn test_device_errors() {
        let mut device = SimulatedDevice::new();
        assert_eq!(exchange(&mut device, "r w26 100"), vec!["index too large", "err"]);
        assert_eq!(exchange(&mut device, "r x99 1"), vec!["invalid type", "err"]);
        assert_eq!(exchange(&mut device, "w w26 1 4x 1"), vec!["invalid facility", "err"]);
        assert_eq!(exchange(&mut device, "w w26 1 1"), vec!["missing user", "err"]);
        assert_eq!(exchange(&mut device, "o 2"), vec!["invalid door", "err"]);
        assert_eq!(exchange(&mut device, "q"), vec!["invalid command", "err"]);
        assert_eq!(
            exchange(&mut device, &"w".repeat(MAX_COMMAND_LENGTH + 1)),
            vec!["command too long", "err"]
        );
    }

    #[test]
    fn test_device_truncates_wide_numbers() {
        let mut device = SimulatedDevice::new();
        assert_eq!(exchange(&mut device, "w w26 1 300 1"), vec!["ok"]);
        assert_eq!(exchange(&mut device, "w w26 2 -1 70000"), vec!["ok"]);
        assert_eq!(exchange(&mut device, "r w26 258"), vec!["2 255 4464", "ok"]);
        assert_eq!(device.credentials()[1], Credential::new(44, 1));
    }

    #[test]
    fn test_device_list_and_clear() {
        let mut device = SimulatedDevice::with_capacity(3);
        device.store(1, Credential::new(44, 12312));

        assert_eq!(
            exchange(&mut device, "l w26"),
            vec!["0 0 0", "1 44 12312", "2 0 0", "ok"]
        );
        assert_eq!(exchange(&mut device, "x w26"), vec!["ok"]);
        assert!(device.credentials().iter().all(Credential::is_empty));
    }

    #[test]
    fn test_device_info_and_open() {
        let mut device = SimulatedDevice::new();
        assert_eq!(exchange(&mut device, "i"), vec!["w26 100", "ok"]);
        assert_eq!(exchange(&mut device, "o 1"), vec!["ok"]);
        assert_eq!(device.opened_doors(), &[1]);
    }
}
