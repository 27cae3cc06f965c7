//! capwait-core — shared model for capacity-convergence waiting.
//!
//! Holds the point-in-time view of an autoscaling group (members and the
//! load-balancing targets they are attached to), the caller's declared
//! capacity bounds, and the resource configuration that drives a wait.
//!
//! Nothing here talks to a cloud API. Snapshots are produced by provider
//! implementations elsewhere and only read by the waiter.

pub mod config;
pub mod duration;
pub mod error;
pub mod types;

pub use config::{GroupWaitConfig, PollConfig, PollStrategy};
pub use duration::{format_duration, parse_duration};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
