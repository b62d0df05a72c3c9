//! Settings file management

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::errors::SettingdError;
use crate::logs::LogLevel;

/// Daemon settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Path of the persisted device registry
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Enable the background status monitor
    #[serde(default = "default_true")]
    pub enable_monitor: bool,

    /// Status re-check interval in seconds
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,

    /// Max concurrent probes during a full scan
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Discovery read timeout in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// Hard cap on a discovery response, bytes
    #[serde(default = "default_max_response")]
    pub max_response_bytes: usize,

    /// Access-point fallback address probed on every scan
    #[serde(default = "default_fallback_address")]
    pub fallback_address: String,
}

fn default_true() -> bool {
    true
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/var/lib/settingd/devices.json")
}

fn default_monitor_interval() -> u64 {
    5
}

fn default_scan_concurrency() -> usize {
    32
}

fn default_connect_timeout() -> u64 {
    1000
}

fn default_read_timeout() -> u64 {
    2000
}

fn default_max_response() -> usize {
    16 * 1024
}

fn default_fallback_address() -> String {
    "192.168.4.1".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            store_path: default_store_path(),
            enable_monitor: true,
            monitor_interval_secs: default_monitor_interval(),
            scan_concurrency: default_scan_concurrency(),
            connect_timeout_ms: default_connect_timeout(),
            read_timeout_ms: default_read_timeout(),
            max_response_bytes: default_max_response(),
            fallback_address: default_fallback_address(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. A missing file means defaults.
    pub async fn load(path: &Path) -> Result<Self, SettingdError> {
        if fs::metadata(path).await.is_err() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await?;
        let settings = serde_json::from_str(&contents)
            .map_err(|e| SettingdError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let settings: Settings = serde_json::from_str("{\"log_level\":\"debug\"}").unwrap();
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.scan_concurrency, 32);
        assert_eq!(settings.monitor_interval_secs, 5);
        assert_eq!(settings.fallback_address, "192.168.4.1");
    }
}
