//! Configuration error type.
//!
//! Startup-time configuration problems are the one error class in this
//! system that is not recovered locally: an unknown selection strategy name
//! or an unparseable region group should fail fast rather than let the
//! process run with a half-valid configuration.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown selection strategy: {0}")]
    UnknownStrategy(String),

    #[error("region group {group_index} lists unknown region grouping rule: {reason}")]
    InvalidRegionGroup { group_index: usize, reason: String },

    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },

    #[error("{field} must be in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
