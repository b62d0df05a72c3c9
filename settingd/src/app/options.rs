//! Application configuration options

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::net::probe::ProbeOptions;
use crate::net::subnet::FALLBACK_AP_ADDR;
use crate::scanner::ScanOptions;
use crate::storage::settings::Settings;
use crate::workers::monitor;

/// Options for the discovery manager
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Probe client tunables
    pub probe: ProbeOptions,

    /// Full-scan tunables
    pub scan: ScanOptions,

    /// Status monitor options
    pub monitor: monitor::Options,

    /// Access-point fallback address probed on every full scan
    pub fallback_address: Ipv4Addr,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            probe: ProbeOptions::default(),
            scan: ScanOptions::default(),
            monitor: monitor::Options::default(),
            fallback_address: FALLBACK_AP_ADDR,
        }
    }
}

impl ManagerOptions {
    /// Build manager options from a settings file.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            probe: ProbeOptions {
                connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
                read_timeout: Duration::from_millis(settings.read_timeout_ms),
                max_response_bytes: settings.max_response_bytes,
                ..ProbeOptions::default()
            },
            scan: ScanOptions {
                max_concurrent: settings.scan_concurrency,
            },
            monitor: monitor::Options {
                interval: Duration::from_secs(settings.monitor_interval_secs),
                ..monitor::Options::default()
            },
            fallback_address: settings
                .fallback_address
                .parse()
                .unwrap_or(FALLBACK_AP_ADDR),
        }
    }
}
