//! The per-conference bridge assignment a caller hands to the selector:
//! which bridges already serve this conference, and how many participants
//! each currently has. Tracking this mapping is the conference-orchestration
//! layer's job; this crate only consumes it.

use std::sync::Arc;

use bridge_common::BridgeAddress;
use bridge_registry::BridgeRecord;

/// An ordered list of `(bridge, participant count)` pairs for one
/// conference. Order is insertion order as tracked by the caller — "the
/// first conference bridge" means the earliest-added entry, not a sort.
#[derive(Debug, Clone, Default)]
pub struct ConferenceBridges {
    entries: Vec<(Arc<BridgeRecord>, u32)>,
}

impl ConferenceBridges {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, bridge: Arc<BridgeRecord>, participants: u32) {
        self.entries.push((bridge, participants));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn first(&self) -> Option<&(Arc<BridgeRecord>, u32)> {
        self.entries.first()
    }

    pub fn contains(&self, address: &BridgeAddress) -> bool {
        self.entries.iter().any(|(bridge, _)| bridge.address() == address)
    }

    pub fn participants_of(&self, address: &BridgeAddress) -> Option<u32> {
        self.entries
            .iter()
            .find(|(bridge, _)| bridge.address() == address)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Arc<BridgeRecord>, u32)> {
        self.entries.iter()
    }

    /// The entry with the fewest participants; ties keep the earliest one
    /// (`Iterator::min_by_key` is stable on ties, returning the first).
    pub fn fewest_participants(&self) -> Option<&(Arc<BridgeRecord>, u32)> {
        self.entries.iter().min_by_key(|(_, count)| *count)
    }
}
