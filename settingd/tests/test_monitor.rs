//! Status monitor lifecycle tests through the manager facade

mod common;

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use settingd::app::manager::DiscoveryManager;
use settingd::app::options::ManagerOptions;
use settingd::net::probe::ProbeOptions;
use settingd::workers::monitor;

fn fast_options(port: u16) -> ManagerOptions {
    ManagerOptions {
        probe: ProbeOptions {
            connect_timeout: Duration::from_millis(200),
            read_timeout: Duration::from_millis(300),
            port,
            ..ProbeOptions::default()
        },
        monitor: monitor::Options {
            interval: Duration::from_millis(50),
            initial_delay: Duration::from_millis(10),
        },
        ..ManagerOptions::default()
    }
}

#[tokio::test]
async fn test_monitor_tracks_liveness_with_one_write_per_change() {
    let port = common::free_port();
    let (_, listener) = common::spawn_silent_listener(Ipv4Addr::new(127, 0, 0, 2), port).await;

    let store = Arc::new(common::MemoryStore::with_devices(vec![common::device(
        "127.0.0.2",
        "Lamp",
        "AA:11",
        true,
    )]));
    let manager = DiscoveryManager::new(
        fast_options(port),
        store.clone(),
        Arc::new(common::FixedAddressProvider(Ipv4Addr::new(127, 0, 0, 1))),
    );

    // Persisted liveness is stale, so the device loads offline
    manager.load().await.unwrap();
    assert!(!manager.devices()[0].is_online);

    manager.start_monitor().await;

    // First cycle proves the listener reachable: one flip, one write
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(manager.devices()[0].is_online);
    assert_eq!(store.save_count(), 1);

    // Unchanged cycles write nothing
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.save_count(), 1);

    // Kill the listener; the next cycle flips the device offline
    listener.abort();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!manager.devices()[0].is_online);
    assert_eq!(store.save_count(), 2);

    manager.stop_monitor().await;
}

#[tokio::test]
async fn test_monitor_never_creates_registry_entries() {
    let port = common::free_port();
    // A reachable address that is not in the registry
    let (_, _listener) = common::spawn_silent_listener(Ipv4Addr::new(127, 0, 0, 2), port).await;

    let store = Arc::new(common::MemoryStore::new());
    let manager = DiscoveryManager::new(
        fast_options(port),
        store,
        Arc::new(common::FixedAddressProvider(Ipv4Addr::new(127, 0, 0, 1))),
    );
    manager.load().await.unwrap();

    manager.start_monitor().await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(manager.devices().is_empty());
    manager.stop_monitor().await;
}

#[tokio::test]
async fn test_monitor_restart_and_stop_are_idempotent() {
    let port = common::free_port();
    let store = Arc::new(common::MemoryStore::with_devices(vec![common::device(
        "127.0.0.2",
        "Lamp",
        "AA:11",
        false,
    )]));
    let manager = DiscoveryManager::new(
        fast_options(port),
        store.clone(),
        Arc::new(common::FixedAddressProvider(Ipv4Addr::new(127, 0, 0, 1))),
    );
    manager.load().await.unwrap();

    // Restart implicitly stops the prior loop; stop twice is a no-op
    manager.start_monitor().await;
    manager.start_monitor().await;
    manager.stop_monitor().await;
    manager.stop_monitor().await;

    // No loop is left running after stop: a listener coming up is not seen
    let (_, _listener) = common::spawn_silent_listener(Ipv4Addr::new(127, 0, 0, 2), port).await;
    let saves_before = store.save_count();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!manager.devices()[0].is_online);
    assert_eq!(store.save_count(), saves_before);
}

#[tokio::test]
async fn test_stop_monitor_returns_promptly() {
    let store = Arc::new(common::MemoryStore::new());
    let manager = DiscoveryManager::new(
        fast_options(common::free_port()),
        store,
        Arc::new(common::FixedAddressProvider(Ipv4Addr::new(127, 0, 0, 1))),
    );

    manager.start_monitor().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stopped = tokio::time::timeout(Duration::from_secs(1), manager.stop_monitor()).await;
    assert!(stopped.is_ok());
}
