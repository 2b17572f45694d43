//! Connection settings: built-in defaults, then the YAML config file, then
//! command line flags.

use std::path::Path;

use dorbo_protocol::ControllerConfig;
use tracing::debug;

use crate::error::CliError;

/// Values given on the command line. `None` keeps the lower-priority value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub read_timeout_secs: Option<f64>,
}

/// Build the controller configuration.
pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<ControllerConfig, CliError> {
    let mut config = match config_file {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
            debug!("loaded config from {}", path.display());
            parse(&text).map_err(|source| CliError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => ControllerConfig::default(),
    };

    apply(&mut config, overrides);
    Ok(config)
}

fn parse(text: &str) -> Result<ControllerConfig, serde_yaml::Error> {
    // An empty document means "all defaults".
    if text.trim().is_empty() {
        return Ok(ControllerConfig::default());
    }
    serde_yaml::from_str(text)
}

fn apply(config: &mut ControllerConfig, overrides: &Overrides) {
    if let Some(port) = &overrides.port {
        config.port = port.clone();
    }
    if let Some(baud_rate) = overrides.baud_rate {
        config.baud_rate = baud_rate;
    }
    if let Some(secs) = overrides.read_timeout_secs {
        config.read_timeout_secs = secs;
    }
}
