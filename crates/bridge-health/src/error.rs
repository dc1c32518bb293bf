//! Errors surfaced purely for structured logging; the scheduler's public
//! operations are themselves infallible (a probe outcome is not a crate-level
//! error, it's routed into the registry as state).

use bridge_common::BridgeAddress;
use bridge_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum HealthError {
    #[error("bridge {0} is already scheduled for health checks")]
    DuplicateSchedule(BridgeAddress),

    #[error("health probe to {address} failed at the transport layer")]
    Transport {
        address: BridgeAddress,
        #[source]
        source: TransportError,
    },

    #[error("bridge {address} returned an unrecognised error condition: {condition}")]
    UnexpectedCondition { address: BridgeAddress, condition: String },
}
