//! Error types for settingd

use thiserror::Error;

/// Main error type for settingd
///
/// Probe-level failures (unreachable hosts, malformed discovery responses)
/// are deliberately not represented here. They are expected outcomes of
/// scanning a mostly-empty subnet and surface as `false` / `None` from the
/// probe client instead of as errors.
#[derive(Error, Debug)]
pub enum SettingdError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("No local IPv4 address: {0}")]
    NoLocalAddress(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for SettingdError {
    fn from(err: anyhow::Error) -> Self {
        SettingdError::Internal(err.to_string())
    }
}
