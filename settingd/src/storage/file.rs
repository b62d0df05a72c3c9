//! JSON file backed device store

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::SettingdError;
use crate::models::device::Device;
use crate::storage::adapter::PersistenceAdapter;

/// Device store writing the whole registry to one JSON file.
///
/// Writes go through a temp file and rename so a crash mid-save never
/// leaves a truncated store behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PersistenceAdapter for FileStore {
    async fn load(&self) -> Result<Vec<Device>, SettingdError> {
        if fs::metadata(&self.path).await.is_err() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path).await?;
        let devices = serde_json::from_str(&contents)?;
        Ok(devices)
    }

    async fn save(&self, devices: &[Device]) -> Result<(), SettingdError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(devices)?;
        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
