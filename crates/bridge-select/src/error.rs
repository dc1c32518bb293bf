//! Selection errors. `select_bridge` returning `None` ("no bridge") is not
//! one of these — that is a normal outcome the caller must handle, not a
//! crate-level error. This enum exists for the one genuinely exceptional
//! path: building a strategy from a malformed configuration.

use bridge_common::error::ConfigError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("cannot build a selection strategy from an invalid configuration")]
    Config(#[from] ConfigError),
}
