//! Error types for the export path

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors raised while loading configuration or talking to the broker
#[derive(Debug, Error)]
pub enum ExportError {
    /// No `config.yaml` in any search directory
    #[error("config.yaml not found in any of: {}", display_paths(.searched))]
    ConfigNotFound {
        /// Directories that were searched, in order
        searched: Vec<PathBuf>,
    },

    /// The file exists but could not be read
    #[error("failed to read {}: {source}", .path.display())]
    ConfigRead {
        /// File that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid connector configuration
    #[error("failed to parse {}: {source}", .path.display())]
    ConfigParse {
        /// File that failed
        path: PathBuf,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// Configuration parsed but cannot be used
    #[error("invalid broker configuration: {0}")]
    InvalidOptions(String),

    /// Broker client failure (connect, ping, produce)
    #[error("broker error: {0}")]
    Broker(String),

    /// A broker operation did not finish in time
    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        /// Operation that timed out
        operation: &'static str,
        /// Deadline that was exceeded
        after: Duration,
    },

    /// Payload could not be encoded
    #[error("failed to marshal payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ExportError {
    /// Create a broker error
    pub fn broker(msg: impl Into<String>) -> Self {
        Self::Broker(msg.into())
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
