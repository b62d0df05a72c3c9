//! Local address lookup
//!
//! The scanner needs the IPv4 address the host currently uses on its LAN.
//! That query sits behind a trait so tests and embedders can substitute a
//! fixed address or a failing provider.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use crate::errors::SettingdError;

/// Source of the host's current LAN IPv4 address.
pub trait AddressProvider: Send + Sync {
    /// The IPv4 address bound to the active LAN interface.
    ///
    /// Fails with [`SettingdError::NoLocalAddress`] when no usable address
    /// exists. Callers must treat that as "scan cannot proceed", not as an
    /// empty subnet.
    fn local_ipv4(&self) -> Result<Ipv4Addr, SettingdError>;
}

/// Default provider using the OS routing table.
///
/// Connecting a UDP socket sends no packets; it only asks the kernel which
/// source address would be used for an outbound route.
pub struct SystemAddressProvider;

impl AddressProvider for SystemAddressProvider {
    fn local_ipv4(&self) -> Result<Ipv4Addr, SettingdError> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .map_err(|e| SettingdError::NoLocalAddress(e.to_string()))?;
        socket
            .connect(("8.8.8.8", 80))
            .map_err(|e| SettingdError::NoLocalAddress(e.to_string()))?;
        let addr = socket
            .local_addr()
            .map_err(|e| SettingdError::NoLocalAddress(e.to_string()))?;

        match addr.ip() {
            IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Ok(ip),
            other => Err(SettingdError::NoLocalAddress(format!(
                "resolved to unusable address {}",
                other
            ))),
        }
    }
}
