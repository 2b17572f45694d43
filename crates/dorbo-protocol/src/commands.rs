//! Commands that can be sent to the access controller firmware.
//!
//! Every command is a single line of space-separated tokens. Credential
//! commands take a type name as their first argument; `w26` is the only type
//! the firmware implements.

use crate::codec::LineCodec;
use crate::responses::Credential;

/// Credential type name for 26-bit Wiegand credentials.
pub const WIEGAND26: &str = "w26";

/// Terminator line for a successful command.
pub const TERMINATOR_OK: &str = "ok";

/// Terminator line for a failed command.
pub const TERMINATOR_ERR: &str = "err";

/// Commands understood by the controller CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Empty line. The firmware answers `ok` without doing anything, which
    /// makes it the handshake probe.
    Probe,

    /// List every stored Wiegand-26 credential.
    ListWiegand26,

    /// Read the Wiegand-26 credential at a storage index.
    ReadWiegand26 {
        /// Storage index.
        index: u8,
    },

    /// Write a Wiegand-26 credential to a storage index.
    WriteWiegand26 {
        /// Storage index.
        index: u8,
        /// Credential to store.
        credential: Credential,
    },

    /// Reset every stored Wiegand-26 credential to facility 0, user 0.
    ClearWiegand26,

    /// Report storage capacity.
    Info,

    /// Pulse the strike of a door.
    OpenDoor {
        /// Door number.
        door: u8,
    },
}

impl Command {
    /// Encode the command as a line to send to the firmware.
    /// Returns the bytes to send (including the `\n` terminator).
    pub fn encode(&self) -> Vec<u8> {
        LineCodec::encode_command(&self.to_command_string())
    }

    /// Get the command string without the terminator.
    pub fn to_command_string(&self) -> String {
        match self {
            Command::Probe => String::new(),
            Command::ListWiegand26 => format!("l {}", WIEGAND26),
            Command::ReadWiegand26 { index } => format!("r {} {}", WIEGAND26, index),
            Command::WriteWiegand26 { index, credential } => format!(
                "w {} {} {} {}",
                WIEGAND26, index, credential.facility, credential.user
            ),
            Command::ClearWiegand26 => format!("x {}", WIEGAND26),
            Command::Info => "i".to_string(),
            Command::OpenDoor { door } => format!("o {}", door),
        }
    }
}
