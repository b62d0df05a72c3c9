//! settingd - Entry Point
//!
//! Discovery daemon for embedded settings devices on the local network.
//! Scans the LAN for devices exposing the discovery endpoint and keeps a
//! persisted registry with live online/offline status.

use std::collections::HashMap;
use std::env;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use settingd::app::manager::DiscoveryManager;
use settingd::app::options::ManagerOptions;
use settingd::logs::{init_logging, LogOptions};
use settingd::models::device::Device;
use settingd::models::event::ScanEvent;
use settingd::net::interface::SystemAddressProvider;
use settingd::storage::file::FileStore;
use settingd::storage::settings::Settings;
use settingd::utils::version_info;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

const DEFAULT_SETTINGS_PATH: &str = "/etc/settingd/settings.json";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version).unwrap());
        return;
    }

    // Retrieve the settings file; missing file means defaults
    let settings_path = cli_args
        .get("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
    let settings = match Settings::load(&settings_path).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            return;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    let options = ManagerOptions::from_settings(&settings);
    let store = Arc::new(FileStore::new(&settings.store_path));
    let manager = Arc::new(DiscoveryManager::new(
        options,
        store,
        Arc::new(SystemAddressProvider),
    ));

    match manager.load().await {
        Ok(count) => info!(
            "loaded {} devices from {}",
            count,
            settings.store_path.display()
        ),
        Err(e) => warn!("failed to load persisted devices: {}", e),
    }

    // One-shot single address check
    if let Some(ip) = cli_args.get("check") {
        run_single_check(&manager, ip).await;
        return;
    }

    // One-shot subnet scan
    if cli_args.contains_key("scan") {
        run_one_shot_scan(&manager).await;
        return;
    }

    // Run the daemon starting here
    info!("Running settingd {}", version.version);
    if settings.enable_monitor {
        manager.start_monitor().await;
    }

    await_shutdown_signal().await;
    manager.shutdown().await;
}

async fn run_single_check(manager: &DiscoveryManager, ip: &str) {
    let addr: Ipv4Addr = match ip.parse() {
        Ok(addr) => addr,
        Err(_) => {
            eprintln!("Invalid IPv4 address: {}", ip);
            return;
        }
    };

    match manager.check_single_device(addr).await {
        Some(device) => print_devices(&[device]),
        None => println!("No settings device found at {}", addr),
    }
}

async fn run_one_shot_scan(manager: &DiscoveryManager) {
    let mut events = manager.subscribe();
    if let Err(e) = manager.start_scan().await {
        error!("Cannot scan: {}", e);
        return;
    }

    let mut last_decile = 0u32;
    loop {
        match events.recv().await {
            Ok(ScanEvent::Progress(fraction)) => {
                let decile = (fraction * 10.0) as u32;
                if decile > last_decile {
                    last_decile = decile;
                    info!("scan progress: {}%", decile * 10);
                }
                if fraction >= 1.0 {
                    break;
                }
            }
            Ok(ScanEvent::StatusChanged) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    manager.wait_for_scan().await;
    print_devices(&manager.devices());
}

fn print_devices(devices: &[Device]) {
    if devices.is_empty() {
        println!("No devices found");
        return;
    }

    println!(
        "{:<16} {:<24} {:<18} {:<10} {}",
        "IP", "NAME", "MAC", "VERSION", "STATUS"
    );
    for device in devices {
        println!(
            "{:<16} {:<24} {:<18} {:<10} {}",
            device.ip_address,
            device.name,
            device.mac,
            device.version,
            if device.is_online { "online" } else { "offline" }
        );
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
