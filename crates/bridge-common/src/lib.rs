//! Shared config, error, identity, and stat-parsing types for the bridge
//! pool and selection core.
//!
//! This crate carries no behaviour of its own beyond validation and
//! parsing; it exists so `bridge-registry`, `bridge-health`, and
//! `bridge-select` share one definition of "what a bridge address is" and
//! "what the recognised configuration keys are".

pub mod address;
pub mod config;
pub mod error;
pub mod stats;

pub use address::{BridgeAddress, ConferenceId};
pub use config::{BridgeSelectionConfig, RegionGroups, SelectionStrategyKind};
pub use error::{ConfigError, ConfigResult};
