//! Error types for the command line tool.

use std::path::PathBuf;

use dorbo_protocol::ControllerError;
use thiserror::Error;

use crate::fobs::FobError;

/// Errors reported by the `dorbo` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Talking to the controller failed.
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// A file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for a controller config.
    #[error("invalid config file {}: {source}", path.display())]
    ConfigParse {
        /// File path.
        path: PathBuf,
        /// YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The fob list contains an unusable entry.
    #[error(transparent)]
    Fob(#[from] FobError),

    /// The fob list does not fit in the controller's storage.
    #[error("{count} fobs do not fit in {capacity} storage slots")]
    TooManyFobs {
        /// Number of fobs in the list.
        count: usize,
        /// Number of slots on the controller.
        capacity: usize,
    },

    /// Writing output failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    /// JSON encoding failed.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
