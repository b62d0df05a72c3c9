//! Device registry
//!
//! The authoritative `mac -> Device` mapping shared by scan workers, the
//! status monitor and user-initiated removal. All mutation goes through
//! the operations here; internal storage is never handed out by reference.
//! Every effective mutation schedules a best-effort persistence write off
//! the caller's path; a failed save is logged and never propagated.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::errors::SettingdError;
use crate::models::device::Device;
use crate::models::event::ScanEvent;
use crate::storage::adapter::PersistenceAdapter;

pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Device>>,
    store: Arc<dyn PersistenceAdapter>,
    events: broadcast::Sender<ScanEvent>,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn PersistenceAdapter>, events: broadcast::Sender<ScanEvent>) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            store,
            events,
        }
    }

    /// Load persisted devices into the registry.
    ///
    /// Persisted liveness is stale by definition, so every loaded device
    /// starts offline until a probe proves otherwise. Records without a
    /// MAC are skipped; they cannot be keyed.
    pub async fn load(&self) -> Result<usize, SettingdError> {
        let loaded = self.store.load().await?;

        let mut devices = self.devices.write().unwrap_or_else(|e| e.into_inner());
        for mut device in loaded {
            if device.mac.is_empty() {
                warn!("skipping persisted device without MAC: {}", device.ip_address);
                continue;
            }
            device.is_online = false;
            devices.insert(device.mac.clone(), device);
        }
        Ok(devices.len())
    }

    /// Merge a scan pass into the registry, insert-or-replace by MAC.
    ///
    /// A full scan is authoritative over the whole known set: devices it
    /// did not rediscover are marked offline (never dropped; deletion is a
    /// user action). A partial pass (single-IP check) only speaks for the
    /// addresses it probed and leaves everything else untouched.
    ///
    /// Returns true when the registry changed.
    pub fn merge(&self, scanned: Vec<Device>, full_scan: bool) -> bool {
        let mut changed = false;
        {
            let mut devices = self.devices.write().unwrap_or_else(|e| e.into_inner());

            if full_scan {
                let seen: HashSet<&str> = scanned.iter().map(|d| d.mac.as_str()).collect();
                for (mac, device) in devices.iter_mut() {
                    if device.is_online && !seen.contains(mac.as_str()) {
                        debug!("device {} not rediscovered, marking offline", mac);
                        device.is_online = false;
                        changed = true;
                    }
                }
            }

            for device in scanned {
                if device.mac.is_empty() {
                    continue;
                }
                if devices.get(&device.mac) != Some(&device) {
                    changed = true;
                }
                devices.insert(device.mac.clone(), device);
            }
        }

        if changed {
            if !full_scan {
                let _ = self.events.send(ScanEvent::StatusChanged);
            }
            self.schedule_save();
        }
        changed
    }

    /// Flip a device's liveness flag.
    ///
    /// A no-op write (same value, or unknown MAC) triggers neither
    /// persistence nor notification. Status checks never create entries.
    pub fn update_status(&self, mac: &str, online: bool) -> bool {
        let changed = {
            let mut devices = self.devices.write().unwrap_or_else(|e| e.into_inner());
            match devices.get_mut(mac) {
                Some(device) if device.is_online != online => {
                    device.is_online = online;
                    true
                }
                _ => false,
            }
        };

        if changed {
            let _ = self.events.send(ScanEvent::StatusChanged);
            self.schedule_save();
        }
        changed
    }

    /// Remove a device by MAC. Returns true when it existed.
    pub fn remove(&self, mac: &str) -> bool {
        let removed = {
            let mut devices = self.devices.write().unwrap_or_else(|e| e.into_inner());
            devices.remove(mac).is_some()
        };

        if removed {
            let _ = self.events.send(ScanEvent::StatusChanged);
            self.schedule_save();
        }
        removed
    }

    /// Drop every device.
    pub fn clear(&self) {
        let was_empty = {
            let mut devices = self.devices.write().unwrap_or_else(|e| e.into_inner());
            let was_empty = devices.is_empty();
            devices.clear();
            was_empty
        };

        if !was_empty {
            let _ = self.events.send(ScanEvent::StatusChanged);
            self.schedule_save();
        }
    }

    /// An independent, display-ordered copy of the registry.
    pub fn snapshot(&self) -> Vec<Device> {
        let devices = self.devices.read().unwrap_or_else(|e| e.into_inner());
        let mut snapshot: Vec<Device> = devices.values().cloned().collect();
        snapshot.sort_by(Device::display_order);
        snapshot
    }

    pub fn len(&self) -> usize {
        let devices = self.devices.read().unwrap_or_else(|e| e.into_inner());
        devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the current state off the caller's path. Low write volume
    /// makes save-on-every-mutation cheaper than dirty tracking.
    fn schedule_save(&self) {
        let devices = self.snapshot();
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.save(&devices).await {
                warn!("failed to persist device registry: {}", e);
            }
        });
    }
}
