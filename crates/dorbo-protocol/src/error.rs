//! Error types for the controller protocol.

use thiserror::Error;

/// Errors that can occur while talking to the access controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The serial device could not be opened or an I/O operation on it failed.
    #[error("connection error on {port}: {source}")]
    Connection {
        /// Serial device path.
        port: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The firmware never answered `ok` to a handshake probe.
    #[error("handshake failed: no \"ok\" after {attempts} probes")]
    HandshakeFailure {
        /// Number of probes sent.
        attempts: u32,
    },

    /// No terminator line arrived before the read timeout.
    #[error("timeout waiting for response to {command:?}")]
    ReadTimeout {
        /// The command that was waiting for a response.
        command: String,
    },

    /// A response did not have the shape expected for the command.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The firmware answered with the `err` terminator.
    #[error("command {command:?} failed: {}", lines.join(","))]
    CommandFailure {
        /// The command that failed.
        command: String,
        /// Diagnostic lines printed by the firmware before `err`.
        lines: Vec<String>,
    },

    /// A command was issued on a controller that is not open.
    #[error("controller is not connected")]
    NotConnected,

    /// A configuration value cannot be used (negative or non-finite timeout, zero baud rate).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ControllerError {
    /// Build a [`ControllerError::Connection`] from anything convertible to an I/O error.
    pub fn connection(port: &str, source: impl Into<std::io::Error>) -> Self {
        ControllerError::Connection {
            port: port.to_string(),
            source: source.into(),
        }
    }

    /// Build a [`ControllerError::ProtocolViolation`].
    pub(crate) fn violation(message: impl Into<String>) -> Self {
        ControllerError::ProtocolViolation(message.into())
    }
}

/// Result type alias for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failure_display_joins_lines() {
        let err = ControllerError::CommandFailure {
            command: "r w26 200".to_string(),
            lines: vec!["index too large".to_string(), "second".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "command \"r w26 200\" failed: index too large,second"
        );
    }

    #[test]
    fn test_connection_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such device");
        let err = ControllerError::connection("/dev/ttyACM9", io);
        assert!(err.to_string().contains("/dev/ttyACM9"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
