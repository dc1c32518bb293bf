//! Opaque identities used throughout the bridge pool.
//!
//! A bridge address mirrors an XMPP JID as seen on the brewery room roster:
//! a bare or full JID (`node@domain` or `node@domain/resource`). Nothing in
//! this crate parses or validates JID grammar; the address is an opaque,
//! orderable, hashable key.

use std::fmt;

/// Unique registry key for a bridge, as published on the brewery roster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BridgeAddress(String);

impl BridgeAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource part after `/`, if present (the brewery room's presence
    /// occupant id commonly carries one).
    pub fn resource(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, resource)| resource)
    }
}

impl fmt::Display for BridgeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BridgeAddress {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for BridgeAddress {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Opaque identity of a conference, scoped by the orchestration layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConferenceId(String);

impl ConferenceId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConferenceId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_part_is_extracted() {
        let addr = BridgeAddress::new("jvb1@brewery.example.com/abcd1234");
        assert_eq!(addr.resource(), Some("abcd1234"));
    }

    #[test]
    fn bare_address_has_no_resource() {
        let addr = BridgeAddress::new("jvb1@brewery.example.com");
        assert_eq!(addr.resource(), None);
    }

    #[test]
    fn addresses_order_lexicographically() {
        let mut addrs = vec![
            BridgeAddress::new("jvb2@brewery.example.com"),
            BridgeAddress::new("jvb1@brewery.example.com"),
        ];
        addrs.sort();
        assert_eq!(addrs[0].as_str(), "jvb1@brewery.example.com");
    }
}
