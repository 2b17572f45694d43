//! Connection settings for the access controller.
//!
//! Durations are stored as fractional seconds so the types deserialize
//! directly from YAML files like:
//!
//! ```yaml
//! port: /dev/ttyACM0
//! baud_rate: 115200
//! read_timeout_secs: 5.0
//! handshake:
//!   probe_timeout_secs: 0.1
//!   budget_secs: 5.0
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ControllerError, ControllerResult};

/// Standard controller baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Per-read timeout used for ordinary commands, in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: f64 = 5.0;

/// Per-read timeout used for each handshake probe, in seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECS: f64 = 0.1;

/// Total time spent probing before the handshake gives up, in seconds.
pub const DEFAULT_HANDSHAKE_BUDGET_SECS: f64 = 5.0;

/// Longest accepted timeout or handshake budget, in seconds (one day).
pub const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Serial connection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Serial device, e.g. `/dev/ttyACM0` or `COM1`.
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Timeout for each line read during a command, in seconds.
    pub read_timeout_secs: f64,
    /// Handshake probing parameters.
    pub handshake: HandshakeConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            handshake: HandshakeConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Create a configuration for a port with default settings.
    pub fn new(port: impl Into<String>) -> Self {
        ControllerConfig {
            port: port.into(),
            ..Default::default()
        }
    }

    /// Get the per-read timeout.
    pub fn read_timeout(&self) -> ControllerResult<Duration> {
        secs_to_duration("read_timeout_secs", self.read_timeout_secs)
    }

    /// Check that every value can be used to open a connection.
    pub fn validate(&self) -> ControllerResult<()> {
        if self.port.is_empty() {
            return Err(ControllerError::InvalidConfig("no serial port given".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(ControllerError::InvalidConfig("baud rate must be positive".to_string()));
        }
        self.read_timeout()?;
        self.handshake.probe_timeout()?;
        self.handshake.attempts()?;
        Ok(())
    }
}

/// Handshake probing parameters.
///
/// The handshake sends empty commands with a short read timeout so that an
/// out-of-sync controller is retried quickly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Read timeout for each probe, in seconds.
    pub probe_timeout_secs: f64,
    /// Total probing time, in seconds.
    pub budget_secs: f64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        HandshakeConfig {
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            budget_secs: DEFAULT_HANDSHAKE_BUDGET_SECS,
        }
    }
}

impl HandshakeConfig {
    /// Get the per-probe read timeout.
    pub fn probe_timeout(&self) -> ControllerResult<Duration> {
        let timeout = secs_to_duration("probe_timeout_secs", self.probe_timeout_secs)?;
        if timeout.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "probe_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(timeout)
    }

    /// Number of probe rounds: `ceil(budget / probe_timeout)`, at least one.
    pub fn attempts(&self) -> ControllerResult<u32> {
        self.probe_timeout()?;
        secs_to_duration("budget_secs", self.budget_secs)?;

        // 5.0 / 0.1 is not exactly 50 in binary floating point.
        let rounds = (self.budget_secs / self.probe_timeout_secs - 1e-9).ceil();
        Ok(rounds.clamp(1.0, u32::MAX as f64) as u32)
    }
}

fn secs_to_duration(name: &str, secs: f64) -> ControllerResult<Duration> {
    if secs > MAX_TIMEOUT_SECS {
        return Err(ControllerError::InvalidConfig(format!(
            "{} must be at most {}, got {}",
            name, MAX_TIMEOUT_SECS, secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ControllerError::InvalidConfig(format!("{} must be a non-negative number, got {}", name, secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::new("/dev/ttyACM0");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.read_timeout().unwrap(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_handshake_attempts() {
        let handshake = HandshakeConfig::default();
        assert_eq!(handshake.attempts().unwrap(), 50);
        assert_eq!(handshake.probe_timeout().unwrap(), Duration::from_millis(100));
    }

    #[test]
    fn test_attempts_round_up() {
        let handshake = HandshakeConfig {
            probe_timeout_secs: 0.3,
            budget_secs: 1.0,
        };
        assert_eq!(handshake.attempts().unwrap(), 4);
    }

    #[test]
    fn test_attempts_at_least_one() {
        let handshake = HandshakeConfig {
            probe_timeout_secs: 0.5,
            budget_secs: 0.0,
        };
        assert_eq!(handshake.attempts().unwrap(), 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ControllerConfig::new("/dev/ttyACM0");
        config.read_timeout_secs = -1.0;
        assert!(matches!(config.validate(), Err(ControllerError::InvalidConfig(_))));

        let mut config = ControllerConfig::new("/dev/ttyACM0");
        config.handshake.probe_timeout_secs = 0.0;
        assert!(matches!(config.validate(), Err(ControllerError::InvalidConfig(_))));

        let config = ControllerConfig::default();
        assert!(matches!(config.validate(), Err(ControllerError::InvalidConfig(_))));
    }

    #[test]
    fn test_huge_timeouts_rejected() {
        let mut config = ControllerConfig::new("/dev/ttyACM0");
        config.read_timeout_secs = 1.0e19;
        assert!(matches!(config.validate(), Err(ControllerError::InvalidConfig(_))));

        let mut config = ControllerConfig::new("/dev/ttyACM0");
        config.handshake.budget_secs = f64::INFINITY;
        assert!(matches!(config.validate(), Err(ControllerError::InvalidConfig(_))));

        let mut config = ControllerConfig::new("/dev/ttyACM0");
        config.read_timeout_secs = MAX_TIMEOUT_SECS;
        assert!(config.validate().is_ok());
    }
}
