//! Shared test fixtures: in-memory store, fixed address providers and
//! fake embedded devices backed by real TCP listeners.

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use settingd::errors::SettingdError;
use settingd::models::device::Device;
use settingd::net::interface::AddressProvider;
use settingd::storage::adapter::PersistenceAdapter;

/// Persistence adapter that counts saves.
pub struct MemoryStore {
    devices: Mutex<Vec<Device>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_devices(Vec::new())
    }

    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            devices: Mutex::new(devices),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn saved_devices(&self) -> Vec<Device> {
        self.devices.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryStore {
    async fn load(&self) -> Result<Vec<Device>, SettingdError> {
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn save(&self, devices: &[Device]) -> Result<(), SettingdError> {
        *self.devices.lock().unwrap() = devices.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Provider reporting a fixed local address.
pub struct FixedAddressProvider(pub Ipv4Addr);

impl AddressProvider for FixedAddressProvider {
    fn local_ipv4(&self) -> Result<Ipv4Addr, SettingdError> {
        Ok(self.0)
    }
}

/// Provider simulating a host without a LAN address.
pub struct NoAddressProvider;

impl AddressProvider for NoAddressProvider {
    fn local_ipv4(&self) -> Result<Ipv4Addr, SettingdError> {
        Err(SettingdError::NoLocalAddress("wifi disabled".to_string()))
    }
}

pub fn device(ip: &str, name: &str, mac: &str, online: bool) -> Device {
    Device {
        ip_address: ip.to_string(),
        name: name.to_string(),
        mac: mac.to_string(),
        kind: "discover".to_string(),
        version: String::new(),
        is_online: online,
    }
}

/// A port on which nothing listens. The listener used to find it is
/// dropped before returning.
pub fn free_port() -> u16 {
    let listener = StdTcpListener::bind(("127.0.0.1", 0)).unwrap();
    listener.local_addr().unwrap().port()
}

/// Spawn a fake device answering every connection with `response` bytes.
/// Aborting the returned handle closes the listener.
pub async fn spawn_fake_raw(bind: Ipv4Addr, port: u16, response: String) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind(SocketAddr::from((bind, port)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let response = response.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
            });
        }
    });

    (addr, handle)
}

/// Spawn a fake settings device with a well-formed discovery response.
pub async fn spawn_fake_device(
    bind: Ipv4Addr,
    port: u16,
    name: &str,
    mac: &str,
) -> (SocketAddr, JoinHandle<()>) {
    let body = format!(
        "{{\"type\":\"discover\",\"name\":\"{}\",\"mac\":\"{}\",\"version\":\"1.0\"}}",
        name, mac
    );
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{}",
        body
    );
    spawn_fake_raw(bind, port, response).await
}

/// Spawn a listener that accepts connections and never responds.
pub async fn spawn_silent_listener(bind: Ipv4Addr, port: u16) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind(SocketAddr::from((bind, port)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            held.push(stream);
        }
    });

    (addr, handle)
}
