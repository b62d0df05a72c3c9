//! Candidate address enumeration
//!
//! Builds the ordered list of addresses a full scan probes: the fixed
//! access-point fallback first, then every usable host of the /24 around
//! the local address.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

/// Default address of a device running in self-hosted access-point mode.
///
/// Always probed, even when unreachable from the current subnet, since the
/// device may not have joined the LAN yet.
pub const FALLBACK_AP_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

/// Enumerate candidate addresses for a full subnet scan.
///
/// Pure function of the local address: `fallback` followed by
/// `base.1 .. base.254` where `base` is the first three octets of
/// `local_ip`. When the fallback lies inside that range it appears once.
pub fn enumerate(local_ip: Ipv4Addr, fallback: Ipv4Addr) -> Vec<Ipv4Addr> {
    let subnet = Ipv4Net::new(local_ip, 24).expect("/24 is a valid prefix length");

    let mut candidates = Vec::with_capacity(255);
    candidates.push(fallback);
    for host in subnet.hosts() {
        if host != fallback {
            candidates.push(host);
        }
    }
    candidates
}
