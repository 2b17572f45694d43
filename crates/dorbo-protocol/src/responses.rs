//! Response types and decoding for the controller protocol.
//!
//! A command's response is the list of data lines the firmware printed before
//! its terminator. Credential lines have the form `<index> <facility> <user>`
//! in decimal.

use serde::{Deserialize, Serialize};

use crate::commands::WIEGAND26;
use crate::error::{ControllerError, ControllerResult};

/// One stored 26-bit Wiegand credential.
///
/// The 26 bits on the wire carry an 8-bit facility code, a 16-bit user
/// (card) number and two parity bits. The firmware does not store parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Credential {
    /// Facility code.
    pub facility: u8,
    /// User (card) number.
    pub user: u16,
}

impl Credential {
    /// Create a credential.
    pub const fn new(facility: u8, user: u16) -> Self {
        Credential { facility, user }
    }

    /// The value a cleared slot holds.
    pub const EMPTY: Credential = Credential::new(0, 0);

    /// Check if this is the cleared value.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.facility, self.user)
    }
}

/// Outcome of one executed command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    /// `true` if the terminator was `ok`, `false` if it was `err`.
    pub success: bool,
    /// Data lines received before the terminator, in order.
    pub lines: Vec<String>,
}

/// Storage capacity reported by the `i` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageInfo {
    /// Number of Wiegand-26 slots.
    pub w26_capacity: u16,
}

impl StorageInfo {
    /// Parse the data lines of an `i` response.
    ///
    /// Format: a single line `w26 <count>`.
    pub fn parse(lines: &[String]) -> ControllerResult<StorageInfo> {
        let line = single_line(lines)?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 || fields[0] != WIEGAND26 {
            return Err(ControllerError::violation(format!(
                "unexpected storage info line: {:?}",
                line
            )));
        }
        let w26_capacity = fields[1].parse().map_err(|_| {
            ControllerError::violation(format!("invalid capacity: {:?}", fields[1]))
        })?;
        Ok(StorageInfo { w26_capacity })
    }
}

/// Decode one line of a list or read response into its storage index and
/// credential.
pub fn decode_credential_line(line: &str) -> ControllerResult<(u8, Credential)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(ControllerError::violation(format!(
            "got {} fields instead of 3: {:?}",
            fields.len(),
            line
        )));
    }

    let index = parse_field(fields[0], "index", line)?;
    let facility = parse_field(fields[1], "facility", line)?;
    let user = parse_field(fields[2], "user", line)?;
    Ok((index, Credential { facility, user }))
}

/// Decode the data lines of an `l w26` response.
///
/// Credentials are returned in response order; the echoed index is not used
/// to reorder them.
pub fn decode_credential_list(lines: &[String]) -> ControllerResult<Vec<Credential>> {
    lines
        .iter()
        .map(|line| decode_credential_line(line).map(|(_, credential)| credential))
        .collect()
}

/// Decode the data lines of an `r w26 <index>` response.
pub fn decode_single_credential(lines: &[String]) -> ControllerResult<Credential> {
    let line = single_line(lines)?;
    decode_credential_line(line).map(|(_, credential)| credential)
}

fn single_line(lines: &[String]) -> ControllerResult<&str> {
    match lines {
        [line] => Ok(line.as_str()),
        _ => Err(ControllerError::violation(format!(
            "expected exactly one response line, got {}",
            lines.len()
        ))),
    }
}

fn parse_field<N: std::str::FromStr>(field: &str, name: &str, line: &str) -> ControllerResult<N> {
    field
        .parse()
        .map_err(|_| ControllerError::violation(format!("invalid {}: {:?} in {:?}", name, field, line)))
}
