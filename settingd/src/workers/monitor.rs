//! Status monitor worker
//!
//! Re-verifies reachability of every registered device on a fixed
//! interval, independent of full scans. Uses the cheap reachability check
//! only; it never performs discovery and never creates registry entries.

use std::future::Future;
use std::net::Ipv4Addr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info};

use crate::net::probe::ProbeClient;
use crate::registry::DeviceRegistry;

/// Status monitor options
#[derive(Debug, Clone)]
pub struct Options {
    /// Re-check interval
    pub interval: Duration,

    /// Initial delay before the first cycle
    pub initial_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            initial_delay: Duration::from_secs(1),
        }
    }
}

/// Run the status monitor loop.
///
/// Every interval: snapshot the registry, probe each device's current
/// address concurrently, flip the flags that changed. The registry is the
/// synchronization boundary; a concurrent full scan cannot corrupt state,
/// but cycles are skipped while one runs since the scan itself refreshes
/// liveness. Returns when the shutdown future resolves, at most one sleep
/// interval after it fires.
pub async fn run<S, F>(
    options: &Options,
    registry: &DeviceRegistry,
    probe: &ProbeClient,
    scan_active: &AtomicBool,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Status monitor starting...");

    sleep_fn(options.initial_delay).await;

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Status monitor shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {
                // Continue with check
            }
        }

        if scan_active.load(Ordering::SeqCst) {
            debug!("full scan in progress, skipping status cycle");
            continue;
        }

        let snapshot = registry.snapshot();
        if snapshot.is_empty() {
            continue;
        }

        let checks = snapshot.into_iter().map(|device| async move {
            let online = match device.ip_address.parse::<Ipv4Addr>() {
                Ok(addr) => probe.is_reachable(addr).await,
                Err(_) => false,
            };
            (device, online)
        });

        for (device, online) in join_all(checks).await {
            if registry.update_status(&device.mac, online) {
                info!(
                    "device {} ({}) is now {}",
                    device.name,
                    device.ip_address,
                    if online { "online" } else { "offline" }
                );
            }
        }
    }
}
