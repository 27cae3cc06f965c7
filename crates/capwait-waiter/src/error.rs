//! Waiter error types.

use capwait_core::ConfigError;
use thiserror::Error;

/// Errors that end a wait without a convergence decision.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("invalid wait configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to describe autoscaling group {group:?}: {source}")]
    FetchGroup {
        group: String,
        source: anyhow::Error,
    },

    #[error("failed to read attachment states for {group:?}: {source}")]
    FetchAttachments {
        group: String,
        source: anyhow::Error,
    },

    #[error("{reason}")]
    Timeout { reason: String },

    #[error("wait cancelled")]
    Cancelled,
}

pub type WaitResult<T> = Result<T, WaitError>;
