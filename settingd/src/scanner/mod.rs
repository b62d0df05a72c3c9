//! Full-subnet scan orchestration using pure async TCP probing.
//!
//! No external binaries (nmap, ping) are required. Concurrency is bounded
//! by a semaphore to avoid exhausting sockets and to avoid self-DoSing the
//! resource-constrained embedded peers.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, info};

use crate::models::device::Device;
use crate::models::event::ScanEvent;
use crate::net::probe::ProbeClient;

/// Scan tunables
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Max concurrent probes; the batch-size knob of the scan
    pub max_concurrent: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { max_concurrent: 32 }
    }
}

/// Probe every candidate address and collect the devices that answered
/// discovery, keyed by MAC. Within one pass a MAC seen at two addresses
/// keeps the later observation.
///
/// Each candidate is checked for reachability first and only queried for
/// discovery when something is listening. After every candidate settles
/// (device, nothing there, or timeout) a `ScanEvent::Progress` with the
/// cumulative fraction is published; the fraction is monotonic and reaches
/// exactly 1.0 once, when the last candidate is accounted for.
///
/// Setting `cancelled` stops dispatching further probes; in-flight probes
/// finish or time out on their own. A cancelled scan does not reach full
/// progress. Individual probe failures never abort the pass; finding zero
/// devices is a valid outcome.
pub async fn scan(
    probe: Arc<ProbeClient>,
    candidates: Vec<Ipv4Addr>,
    options: &ScanOptions,
    events: broadcast::Sender<ScanEvent>,
    cancelled: Arc<AtomicBool>,
) -> Vec<Device> {
    let total = candidates.len();
    if total == 0 {
        let _ = events.send(ScanEvent::Progress(1.0));
        return Vec::new();
    }

    info!("scanning {} candidate addresses", total);

    let scanned = Arc::new(AtomicUsize::new(0));
    let semaphore = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(total);

    for host in candidates {
        if cancelled.load(Ordering::SeqCst) {
            info!("scan cancelled, not dispatching remaining candidates");
            break;
        }

        let sem = Arc::clone(&semaphore);
        let probe = Arc::clone(&probe);
        let scanned = Arc::clone(&scanned);
        let events = events.clone();
        let cancelled = Arc::clone(&cancelled);

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.ok()?;
            if cancelled.load(Ordering::SeqCst) {
                return None;
            }

            let device = if probe.is_reachable(host).await {
                probe.discover(host).await
            } else {
                None
            };

            let done = scanned.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = events.send(ScanEvent::Progress(done as f32 / total as f32));
            device
        }));
    }

    let mut found: HashMap<String, Device> = HashMap::new();
    for handle in handles {
        if let Ok(Some(device)) = handle.await {
            debug!("found device: {} at {}", device.mac, device.ip_address);
            found.insert(device.mac.clone(), device);
        }
    }

    info!("scan complete: {} devices found", found.len());
    found.into_values().collect()
}
