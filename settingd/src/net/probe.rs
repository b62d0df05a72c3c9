//! TCP probe client
//!
//! Two operations against a candidate address: a cheap reachability check
//! (does anything accept on port 80) and a full discovery round trip that
//! identifies a settings device. Embedded HTTP stacks in the field are
//! frequently non-compliant, so the discovery parse extracts the JSON
//! object between the first `{` and the last `}` of the raw response
//! instead of parsing HTTP framing, and both response size and read time
//! are hard-capped.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::models::device::Device;

/// Marker value a discovery payload must carry in its `type` field
const DISCOVER_MARKER: &str = "discover";

/// Probe tunables
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Total time allowed for reading a discovery response
    pub read_timeout: Duration,

    /// Hard cap on response size read from a peer
    pub max_response_bytes: usize,

    /// Port the discovery service listens on
    pub port: u16,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(1000),
            read_timeout: Duration::from_millis(2000),
            max_response_bytes: 16 * 1024,
            port: 80,
        }
    }
}

/// Discovery payload reported by a settings device
#[derive(Debug, Deserialize)]
struct DiscoverPayload {
    #[serde(rename = "type", default)]
    kind: String,

    #[serde(default)]
    name: String,

    #[serde(default)]
    mac: String,

    #[serde(default)]
    version: String,
}

/// Timeout-bounded TCP prober for discovery endpoints
pub struct ProbeClient {
    options: ProbeOptions,
}

impl ProbeClient {
    pub fn new(options: ProbeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// True iff a TCP connection to `host` succeeds within the connect
    /// timeout. Refused, timed out and unreachable all mean `false`; this
    /// never fails. The socket is dropped immediately on every path.
    pub async fn is_reachable(&self, host: Ipv4Addr) -> bool {
        let addr = SocketAddr::new(IpAddr::V4(host), self.options.port);
        matches!(
            timeout(self.options.connect_timeout, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }

    /// Send the discovery request to `host` and parse the response.
    ///
    /// Returns `None` for anything that is not a settings device: connect
    /// or write failure, no response within the read timeout, no JSON in
    /// the body, a payload without the discover marker, or empty identity
    /// fields. A successful parse proves liveness, so the returned device
    /// is online.
    pub async fn discover(&self, host: Ipv4Addr) -> Option<Device> {
        let addr = SocketAddr::new(IpAddr::V4(host), self.options.port);
        let mut stream = timeout(self.options.connect_timeout, TcpStream::connect(addr))
            .await
            .ok()?
            .ok()?;

        let request = format!(
            "GET /settings?action=discover HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            host
        );
        stream.write_all(request.as_bytes()).await.ok()?;

        let raw = self.read_response(&mut stream).await;
        drop(stream);
        if raw.is_empty() {
            return None;
        }

        let device = parse_discover_response(host, &String::from_utf8_lossy(&raw));
        if let Some(ref device) = device {
            debug!("discovered {} ({}) at {}", device.name, device.mac, host);
        }
        device
    }

    /// Read until EOF, the byte cap or the read deadline, whichever comes
    /// first. Whatever arrived by then is still handed to the parser; a
    /// peer that stalls after sending its payload should not lose the scan.
    async fn read_response(&self, stream: &mut TcpStream) -> Vec<u8> {
        let cap = self.options.max_response_bytes;
        let mut raw: Vec<u8> = Vec::new();

        let read_all = async {
            let mut chunk = [0u8; 1024];
            loop {
                match stream.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        raw.extend_from_slice(&chunk[..n]);
                        if raw.len() >= cap {
                            break;
                        }
                    }
                }
            }
        };
        let _ = timeout(self.options.read_timeout, read_all).await;

        raw.truncate(cap);
        raw
    }
}

/// Locate and decode a discovery payload inside a raw response.
///
/// Tolerant of arbitrary HTTP noise around the JSON object; strict about
/// the payload itself: the discover marker and non-empty `name` and `mac`
/// are required.
fn parse_discover_response(host: Ipv4Addr, raw: &str) -> Option<Device> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }

    let payload: DiscoverPayload = serde_json::from_str(&raw[start..=end]).ok()?;
    if payload.kind != DISCOVER_MARKER || payload.name.is_empty() || payload.mac.is_empty() {
        return None;
    }

    Some(Device {
        ip_address: host.to_string(),
        name: payload.name,
        mac: payload.mac,
        kind: payload.kind,
        version: payload.version,
        is_online: true,
    })
}
