//! Persistence adapter interface
//!
//! The registry only needs load and wholesale save. Failures stay inside
//! the storage layer's caller as logged events; the in-memory registry is
//! authoritative for the session regardless of persistence health.

use async_trait::async_trait;

use crate::errors::SettingdError;
use crate::models::device::Device;

/// Durable key-value backing for the device registry
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Load the persisted device list. A missing store is an empty list,
    /// not an error.
    async fn load(&self) -> Result<Vec<Device>, SettingdError>;

    /// Replace the persisted device list wholesale.
    async fn save(&self, devices: &[Device]) -> Result<(), SettingdError>;
}
