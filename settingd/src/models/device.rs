//! Discovered device model

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Default category reported when a peer omits its type field
pub const DEFAULT_KIND: &str = "discover";

/// An embedded peer discovered on the local network.
///
/// Identity is the hardware address (`mac`); the network address may change
/// between scans and is overwritten by the most recent discovery. Only
/// `is_online` is ever mutated by a bare reachability check. Every other
/// field comes from a parsed discovery payload or from persisted storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Current IPv4 address, dotted-quad
    #[serde(rename = "ipAddress")]
    pub ip_address: String,

    /// Display name reported by the peer
    pub name: String,

    /// Stable hardware identifier, the registry key
    pub mac: String,

    /// Peer-reported category
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,

    /// Peer-reported firmware version, may be empty
    #[serde(default)]
    pub version: String,

    /// Liveness flag, set by the freshest probe outcome
    #[serde(rename = "isOnline", default)]
    pub is_online: bool,
}

fn default_kind() -> String {
    DEFAULT_KIND.to_string()
}

impl Device {
    /// Display ordering: online devices first, then name ascending
    /// case-insensitive, then MAC for a stable total order.
    pub fn display_order(a: &Device, b: &Device) -> Ordering {
        b.is_online
            .cmp(&a.is_online)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.mac.cmp(&b.mac))
    }
}
