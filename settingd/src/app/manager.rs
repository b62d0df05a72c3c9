//! Discovery manager facade
//!
//! Composes the enumerator, probe client, scan orchestrator, registry and
//! status monitor behind the surface the UI layer consumes. Owns the
//! lifecycle of background tasks: one full scan at a time, an idempotently
//! restartable monitor, and a shutdown that terminates both.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::app::options::ManagerOptions;
use crate::errors::SettingdError;
use crate::models::device::Device;
use crate::models::event::ScanEvent;
use crate::net::interface::AddressProvider;
use crate::net::probe::ProbeClient;
use crate::net::subnet;
use crate::registry::DeviceRegistry;
use crate::scanner;
use crate::storage::adapter::PersistenceAdapter;
use crate::workers::monitor;

/// Capacity of the observer event channel; sized for a full /24 worth of
/// progress events without lagging a slow subscriber.
const EVENT_CHANNEL_CAPACITY: usize = 512;

struct MonitorHandle {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct DiscoveryManager {
    options: ManagerOptions,
    probe: Arc<ProbeClient>,
    registry: Arc<DeviceRegistry>,
    addresses: Arc<dyn AddressProvider>,
    events_tx: broadcast::Sender<ScanEvent>,
    scan_active: Arc<AtomicBool>,
    scan_cancelled: Arc<AtomicBool>,
    scan_task: Mutex<Option<JoinHandle<()>>>,
    monitor: Mutex<Option<MonitorHandle>>,
}

impl DiscoveryManager {
    pub fn new(
        options: ManagerOptions,
        store: Arc<dyn PersistenceAdapter>,
        addresses: Arc<dyn AddressProvider>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let registry = Arc::new(DeviceRegistry::new(store, events_tx.clone()));
        let probe = Arc::new(ProbeClient::new(options.probe.clone()));

        Self {
            options,
            probe,
            registry,
            addresses,
            events_tx,
            scan_active: Arc::new(AtomicBool::new(false)),
            scan_cancelled: Arc::new(AtomicBool::new(false)),
            scan_task: Mutex::new(None),
            monitor: Mutex::new(None),
        }
    }

    /// Load persisted devices into the registry. Returns the device count.
    pub async fn load(&self) -> Result<usize, SettingdError> {
        self.registry.load().await
    }

    /// Subscribe to progress and status events.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events_tx.subscribe()
    }

    /// Ordered snapshot of known devices.
    pub fn devices(&self) -> Vec<Device> {
        self.registry.snapshot()
    }

    /// The host's current LAN address.
    pub fn local_ip(&self) -> Result<Ipv4Addr, SettingdError> {
        self.addresses.local_ipv4()
    }

    /// True while a full scan is running.
    pub fn is_scanning(&self) -> bool {
        self.scan_active.load(Ordering::SeqCst)
    }

    /// Start a full subnet scan in the background.
    ///
    /// Fails only on the platform precondition: no local address means the
    /// scan cannot proceed, which is distinct from finding nothing. A call
    /// while a scan is already running is a no-op.
    pub async fn start_scan(&self) -> Result<(), SettingdError> {
        let local_ip = self.addresses.local_ipv4()?;

        let mut task = self.scan_task.lock().await;
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                debug!("scan already running, ignoring start request");
                return Ok(());
            }
        }

        let candidates = subnet::enumerate(local_ip, self.options.fallback_address);
        info!("starting subnet scan from {}", local_ip);

        self.scan_cancelled.store(false, Ordering::SeqCst);
        self.scan_active.store(true, Ordering::SeqCst);

        let probe = Arc::clone(&self.probe);
        let registry = Arc::clone(&self.registry);
        let events = self.events_tx.clone();
        let scan_options = self.options.scan.clone();
        let scan_active = Arc::clone(&self.scan_active);
        let cancelled = Arc::clone(&self.scan_cancelled);

        *task = Some(tokio::spawn(async move {
            let found = scanner::scan(probe, candidates, &scan_options, events, cancelled).await;
            registry.merge(found, true);
            scan_active.store(false, Ordering::SeqCst);
        }));

        Ok(())
    }

    /// Stop dispatching new probes; in-flight probes finish or time out.
    pub fn cancel_scan(&self) {
        self.scan_cancelled.store(true, Ordering::SeqCst);
    }

    /// Wait for the running scan task, if any, to finish.
    pub async fn wait_for_scan(&self) {
        let handle = self.scan_task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("scan task failed: {}", e);
            }
        }
    }

    /// Probe a single address and merge the result as a partial pass.
    ///
    /// Known devices at other addresses are untouched; a device that does
    /// not answer discovery here yields `None` and changes nothing.
    pub async fn check_single_device(&self, ip: Ipv4Addr) -> Option<Device> {
        let device = if self.probe.is_reachable(ip).await {
            self.probe.discover(ip).await
        } else {
            None
        };

        if let Some(ref device) = device {
            self.registry.merge(vec![device.clone()], false);
        }
        device
    }

    /// Remove a device by MAC. Returns true when it existed.
    pub fn remove_device(&self, mac: &str) -> bool {
        self.registry.remove(mac)
    }

    /// Drop all known devices.
    pub fn clear_devices(&self) {
        self.registry.clear()
    }

    /// Start the background status monitor.
    ///
    /// Idempotent restart: a running monitor is stopped first, so two
    /// overlapping loops can never exist.
    pub async fn start_monitor(&self) {
        let mut monitor_slot = self.monitor.lock().await;
        stop_monitor_handle(monitor_slot.take()).await;

        info!("Initializing status monitor...");

        let (shutdown_tx, mut shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
        let options = self.options.monitor.clone();
        let registry = Arc::clone(&self.registry);
        let probe = Arc::clone(&self.probe);
        let scan_active = Arc::clone(&self.scan_active);

        let handle = tokio::spawn(async move {
            monitor::run(
                &options,
                registry.as_ref(),
                probe.as_ref(),
                scan_active.as_ref(),
                |wait| tokio::time::sleep(wait),
                Box::pin(async move {
                    let _ = shutdown_rx.recv().await;
                }),
            )
            .await;
        });

        *monitor_slot = Some(MonitorHandle { shutdown_tx, handle });
    }

    /// Stop the status monitor. A no-op when it is not running.
    pub async fn stop_monitor(&self) {
        let mut monitor_slot = self.monitor.lock().await;
        stop_monitor_handle(monitor_slot.take()).await;
    }

    /// Stop the monitor and wait out any running scan.
    pub async fn shutdown(&self) {
        self.stop_monitor().await;
        self.cancel_scan();
        self.wait_for_scan().await;
        info!("Discovery manager shut down");
    }
}

async fn stop_monitor_handle(handle: Option<MonitorHandle>) {
    let Some(mon) = handle else {
        return;
    };

    if mon.shutdown_tx.send(()).is_err() {
        // Receiver already gone, the task is dead or finishing
        mon.handle.abort();
        return;
    }
    if let Err(e) = mon.handle.await {
        if !e.is_cancelled() {
            error!("status monitor task failed: {}", e);
        }
    }
}
