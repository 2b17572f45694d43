//! Fob list parsing.
//!
//! A fob list has one enabled fob per line as `<facility> <user>` in decimal,
//! the format printed by the spreadsheet export tool. Blank lines and lines
//! starting with `#` are ignored.

use dorbo_protocol::Credential;
use thiserror::Error;

/// A fob list entry that cannot be turned into a credential.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FobError {
    /// The line is not two decimal numbers.
    #[error("line {line}: expected \"<facility> <user>\", got {text:?}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        text: String,
    },

    /// Facility code above 255.
    #[error("line {line}: facility {value} is out of range (0-255)")]
    FacilityOutOfRange {
        /// 1-based line number.
        line: usize,
        /// Parsed value.
        value: u64,
    },

    /// User number above 65535.
    #[error("line {line}: user {value} is out of range (0-65535)")]
    UserOutOfRange {
        /// 1-based line number.
        line: usize,
        /// Parsed value.
        value: u64,
    },
}

/// Parse a fob list into credentials, in file order.
pub fn parse_fob_list(text: &str) -> Result<Vec<Credential>, FobError> {
    let mut fobs = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let malformed = || FobError::Malformed {
            line,
            text: trimmed.to_string(),
        };
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let [facility, user] = fields.as_slice() else {
            return Err(malformed());
        };
        let facility: u64 = facility.parse().map_err(|_| malformed())?;
        let user: u64 = user.parse().map_err(|_| malformed())?;

        let facility = u8::try_from(facility)
            .map_err(|_| FobError::FacilityOutOfRange { line, value: facility })?;
        let user = u16::try_from(user)
            .map_err(|_| FobError::UserOutOfRange { line, value: user })?;
        fobs.push(Credential::new(facility, user));
    }

    Ok(fobs)
}
