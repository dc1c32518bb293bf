//! The message transport boundary.
//!
//! The actual XMPP stanza plumbing (presence, pubsub, request/response)
//! lives outside this workspace. What the health-check scheduler needs from
//! it is exactly two
//! things — "are we connected at all" and "send a health request to this
//! address, and tell me what came back" — and this trait is that minimal
//! surface. It carries no stanza/XML types.

mod mock;

pub use mock::{MockTransport, ScriptedReply};

use bridge_common::BridgeAddress;
use thiserror::Error;

/// Transport-level failure distinct from an application-level probe
/// outcome — the probe procedure only calls this path when the transport
/// itself cannot even attempt the send (not connected is
/// handled separately by [`MessageTransport::is_connected`], this is for
/// unexpected send-time failures).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to address health probe to {0}")]
    SendFailed(BridgeAddress),
}

/// The three-way classification of a completed probe attempt. `Timeout`
/// here means "no reply
/// arrived within the transport's own reply-timeout bound" for a *single*
/// attempt; the scheduler is responsible for the second-chance retry that
/// turns one timed-out attempt into (at most) two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeReply {
    Success,
    Error(ErrorCondition),
    Timeout,
}

/// The condition carried by an error-type reply stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCondition {
    InternalServerError,
    ServiceUnavailable,
    Other(String),
}

/// Request-reply stanza pattern used for a single bridge health probe.
#[async_trait::async_trait]
pub trait MessageTransport: Send + Sync {
    /// Whether the underlying connection (e.g. the XMPP stream to the
    /// brewery's server) is currently up. The scheduler skips a probe
    /// entirely (emitting no outcome) when this is false.
    fn is_connected(&self) -> bool;

    /// Send a health request addressed to `to` and wait for a reply up to
    /// this transport's own reply timeout, returning the classified
    /// outcome. Never returns `Err` for a timeout — that's `Ok(ProbeReply::Timeout)`.
    async fn send_health_probe(&self, to: &BridgeAddress) -> Result<ProbeReply, TransportError>;
}
