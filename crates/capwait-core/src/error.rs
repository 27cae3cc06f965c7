//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading or interpreting a wait configuration.
///
/// All of these are surfaced before any polling happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid poll policy: {0}")]
    Poll(String),
}
